//! MQTT topic path utilities.
//!
//! Topics are `/`-separated paths. Joining discards empty segments and bare
//! separators and trims separators from each segment, so the result never
//! starts or ends with `/`.

/// Separator between topic segments.
pub const SEPARATOR: char = '/';

/// Trim [`SEPARATOR`] from the start and end of a topic.
#[must_use]
pub fn trim_topic(topic: &str) -> &str {
    topic.trim_matches(SEPARATOR)
}

/// Join topic segments with [`SEPARATOR`], trimming each segment and skipping
/// segments that are empty after trimming.
///
/// # Examples
///
/// ```
/// use hassync_core::join_topic;
///
/// assert_eq!(join_topic(["/hassync/", "", "light", "/"]), "hassync/light");
/// ```
#[must_use]
pub fn join_topic<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = String::new();

    for part in parts {
        let part = trim_topic(part.as_ref());
        if part.is_empty() {
            continue;
        }

        if !result.is_empty() {
            result.push(SEPARATOR);
        }
        result.push_str(part);
    }

    result
}

/// Check whether a topic matches an MQTT subscription filter.
///
/// `+` matches exactly one level and `#` matches the remaining levels
/// (including none). Topics starting with `$` are never matched by a filter
/// whose first level is a wildcard.
#[must_use]
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split(SEPARATOR);
    let mut topic_levels = topic.split(SEPARATOR);

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
