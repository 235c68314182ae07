//! Discovery document builder.
//!
//! A [`DocumentBuilder`] writes fields into a JSON object while collecting
//! every violation instead of stopping at the first one. Field helpers come in
//! three flavors:
//!
//! - required: a missing or zero value records an error
//! - optional: a missing or zero value is omitted (no key at all)
//! - paired: a state topic and a command topic that must be configured together
//!
//! A value is zero when it serializes to `null`, `false`, `0`, `""`, `[]` or `{}`.

use hassync_core::value::value_topic;
use hassync_core::{RemoteValue, Value};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Builds one JSON object of a discovery document.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    fields: Map<String, JsonValue>,
    errors: ValidationErrors,
}

impl DocumentBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a field that must be present and non-zero.
    pub fn required<V: Serialize + ?Sized>(&mut self, name: &str, key: &str, value: &V) {
        match encode(value) {
            Ok(json) if is_zero(&json) => self.fail(name, FieldErrorKind::ValueRequired),
            Ok(json) => {
                self.fields.insert(key.to_string(), json);
            }
            Err(kind) => self.fail(name, kind),
        }
    }

    /// Encode a field unless it is zero.
    pub fn optional<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) {
        match encode(value) {
            Ok(json) if is_zero(&json) => {}
            Ok(json) => {
                self.fields.insert(key.to_string(), json);
            }
            Err(kind) => self.fail(key, kind),
        }
    }

    /// Encode a field unless it is zero or equal to `default`.
    pub fn optional_unless<V: Serialize + PartialEq>(&mut self, key: &str, value: &V, default: &V) {
        if value != default {
            self.optional(key, value);
        }
    }

    /// Encode a duration as whole seconds unless it is zero.
    pub fn optional_seconds(&mut self, key: &str, value: Duration) {
        self.optional(key, &value.as_secs());
    }

    /// Encode a URL as a string if present.
    pub fn optional_url(&mut self, key: &str, value: Option<&Url>) {
        if let Some(url) = value {
            self.optional(key, url.as_str());
        }
    }

    /// Write `value` as-is, including `null`.
    pub fn insert(&mut self, key: &str, value: JsonValue) {
        self.fields.insert(key.to_string(), value);
    }

    /// Encode a topic that must not be empty.
    pub fn required_topic(&mut self, name: &str, key: &str, topic: String) {
        if topic.is_empty() {
            self.fail(name, FieldErrorKind::TopicRequired);
        } else {
            self.fields.insert(key.to_string(), JsonValue::String(topic));
        }
    }

    /// Encode a topic unless it is empty.
    pub fn optional_topic(&mut self, key: &str, topic: String) {
        if !topic.is_empty() {
            self.fields.insert(key.to_string(), JsonValue::String(topic));
        }
    }

    /// Encode the topics of a state and command cell pair.
    ///
    /// Both absent omits both keys. Exactly one absent records
    /// [`FieldErrorKind::MissingPairedTopic`]. Both present requires both topics.
    pub fn paired_topics<T>(
        &mut self,
        name: &str,
        state_key: &str,
        state: Option<&Value<T>>,
        command_key: &str,
        command: Option<&RemoteValue<T>>,
        prefix: &str,
    ) where
        T: Clone + Send + Sync + 'static,
    {
        match (state, command) {
            (None, None) => {}
            (Some(state), Some(command)) => {
                self.required_topic(name, state_key, state.fully_qualified_topic(prefix));
                self.required_topic(name, command_key, command.fully_qualified_topic(prefix));
            }
            _ => self.fail(name, FieldErrorKind::MissingPairedTopic),
        }
    }

    /// Encode the topic of an optional outbound cell.
    pub fn optional_value_topic<T>(&mut self, key: &str, value: Option<&Value<T>>, prefix: &str)
    where
        T: Clone + Send + Sync,
    {
        self.optional_topic(key, value_topic(value, prefix));
    }

    /// Record a failure for `name`.
    pub fn fail(&mut self, name: &str, kind: FieldErrorKind) {
        self.errors.push(FieldError {
            field: name.to_string(),
            kind,
        });
    }

    /// Adopt errors collected elsewhere, e.g. by a nested builder.
    pub fn extend_errors(&mut self, errors: ValidationErrors) {
        self.errors.extend(errors);
    }

    /// Finish the object.
    ///
    /// # Errors
    ///
    /// Returns every error recorded while building.
    pub fn finish(self) -> Result<Map<String, JsonValue>, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self.fields)
        } else {
            Err(self.errors)
        }
    }
}

fn encode<V: Serialize + ?Sized>(value: &V) -> Result<JsonValue, FieldErrorKind> {
    serde_json::to_value(value).map_err(|e| FieldErrorKind::Encode(e.to_string()))
}

fn is_zero(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(fields) => fields.is_empty(),
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldErrorKind {
    /// A required value is missing or zero
    #[error("value is required")]
    ValueRequired,
    /// A required topic is missing
    #[error("topic is required")]
    TopicRequired,
    /// Only one of a state/command topic pair is configured
    #[error("state and command topics must both be configured")]
    MissingPairedTopic,
    /// The value could not be encoded
    #[error("encode error: {0}")]
    Encode(String),
}

/// One field violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {kind}")]
pub struct FieldError {
    /// Field name, scoped by component key where relevant
    pub field: String,
    /// What went wrong
    pub kind: FieldErrorKind,
}

/// Every field violation found while building a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Whether any error of the same kind is present. The payload of
    /// [`FieldErrorKind::Encode`] is ignored.
    #[must_use]
    pub fn contains(&self, kind: &FieldErrorKind) -> bool {
        self.errors
            .iter()
            .any(|e| std::mem::discriminant(&e.kind) == std::mem::discriminant(kind))
    }

    /// Whether `field` has an error of the given kind.
    #[must_use]
    pub fn contains_field(&self, field: &str, kind: &FieldErrorKind) -> bool {
        self.errors.iter().any(|e| e.field == field && e.kind == *kind)
    }

    /// Prefix every field name with `scope`.
    #[must_use]
    pub fn scoped(mut self, scope: &str) -> Self {
        for error in &mut self.errors {
            error.field = format!("{scope}.{}", error.field);
        }
        self
    }

    /// Iterate over the errors in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append every error of `other`.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassync_core::codec::{display_marshaler, from_str_unmarshaler};
    use serde_json::json;

    #[test]
    fn optional_zero_values_are_omitted() {
        let mut doc = DocumentBuilder::new();
        doc.optional("s", "");
        doc.optional("b", &false);
        doc.optional("n", &0u32);
        doc.optional("v", &Vec::<String>::new());
        doc.optional("o", &None::<String>);
        doc.optional_seconds("d", Duration::ZERO);
        doc.optional_url("u", None);
        doc.optional_topic("t", String::new());

        assert!(doc.finish().unwrap().is_empty());
    }

    #[test]
    fn small_floats_are_not_zero() {
        let mut doc = DocumentBuilder::new();
        doc.optional("min", &1e-20_f64);
        doc.optional("max", &-0.0_f64);
        doc.required("step", "step", &f64::MIN_POSITIVE);

        assert_eq!(
            JsonValue::Object(doc.finish().unwrap()),
            json!({ "min": 1e-20, "step": f64::MIN_POSITIVE })
        );
    }

    #[test]
    fn optional_values_are_encoded() {
        let url = Url::parse("https://example.com/lamp.png").unwrap();
        let mut doc = DocumentBuilder::new();
        doc.optional("ic", "mdi:lamp");
        doc.optional("opt", &true);
        doc.optional_seconds("exp_after", Duration::from_millis(90_500));
        doc.optional_url("picture", Some(&url));
        doc.optional_unless("on_cmd_type", &"first", &"last");
        doc.optional_unless("skipped", &"last", &"last");

        assert_eq!(
            JsonValue::Object(doc.finish().unwrap()),
            json!({
                "ic": "mdi:lamp",
                "opt": true,
                "exp_after": 90,
                "picture": "https://example.com/lamp.png",
                "on_cmd_type": "first",
            })
        );
    }

    #[test]
    fn errors_are_aggregated() {
        let mut doc = DocumentBuilder::new();
        doc.required("unique id", "uniq_id", "");
        doc.required_topic("availability", "avty_t", String::new());
        doc.required("platform", "p", "light");

        let errors = doc.finish().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_field("unique id", &FieldErrorKind::ValueRequired));
        assert!(errors.contains_field("availability", &FieldErrorKind::TopicRequired));

        let message = errors.to_string();
        assert!(message.contains("unique id: value is required"));
        assert!(message.contains("availability: topic is required"));
    }

    #[test]
    fn paired_topics() {
        let state = Value::new("brightness", Some(display_marshaler::<u32>()));
        let command = RemoteValue::new("brightness/set", from_str_unmarshaler::<u32>());

        let mut doc = DocumentBuilder::new();
        doc.paired_topics::<u32>("brightness", "bri_stat_t", None, "bri_cmd_t", None, "lamp");
        assert!(doc.finish().unwrap().is_empty());

        let mut doc = DocumentBuilder::new();
        doc.paired_topics("brightness", "bri_stat_t", Some(&state), "bri_cmd_t", None, "lamp");
        let errors = doc.finish().unwrap_err();
        assert!(errors.contains(&FieldErrorKind::MissingPairedTopic));

        let mut doc = DocumentBuilder::new();
        doc.paired_topics(
            "brightness",
            "bri_stat_t",
            Some(&state),
            "bri_cmd_t",
            Some(&command),
            "lamp",
        );
        let fields = doc.finish().unwrap();
        assert_eq!(fields["bri_stat_t"], "lamp/brightness");
        assert_eq!(fields["bri_cmd_t"], "lamp/brightness/set");
    }

    #[test]
    fn scoped_errors_keep_kind() {
        let mut doc = DocumentBuilder::new();
        doc.fail("command", FieldErrorKind::TopicRequired);
        let errors = doc.finish().unwrap_err().scoped("lamp");

        assert!(errors.contains_field("lamp.command", &FieldErrorKind::TopicRequired));
        assert!(!errors.contains(&FieldErrorKind::ValueRequired));
        assert!(!errors.contains(&FieldErrorKind::Encode(String::new())));
        assert_eq!(errors.iter().count(), 1);
    }
}
