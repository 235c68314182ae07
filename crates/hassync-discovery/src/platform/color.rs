//! Light color values.
//!
//! Home Assistant sends colors as comma-separated numbers, e.g. `255,128,0`
//! for RGB and `30.5,100` for hue/saturation. `Display` and `FromStr` use that
//! form, so the generic text codecs apply.

use std::fmt;
use std::str::FromStr;

/// Hue (0-360) and saturation (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HueSat {
    /// Hue in degrees
    pub hue: f64,
    /// Saturation in percent
    pub saturation: f64,
}

/// CIE 1931 xy color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Xy {
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
}

/// 8-bit red, green and blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

/// RGB plus an 8-bit white channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgbw {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// White
    pub w: u8,
}

/// RGB plus cold and warm white channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgbww {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Cold white
    pub cw: u8,
    /// Warm white
    pub ww: u8,
}

impl Rgb {
    /// Hex form, e.g. `#ff8000`.
    #[must_use]
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Rgbw {
    /// Hex form including the white channel.
    #[must_use]
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.w)
    }
}

impl Rgbww {
    /// Hex form including both white channels.
    #[must_use]
    pub fn hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.cw, self.ww
        )
    }
}

/// Split `s` into exactly `N` comma-separated numbers.
fn parse_parts<T: FromStr, const N: usize>(kind: &'static str, s: &str) -> Result<[T; N], ColorParseError> {
    let invalid = || ColorParseError {
        kind,
        input: s.to_string(),
    };

    let parts: Vec<T> = s
        .split(',')
        .map(|part| part.trim().parse::<T>().map_err(|_| invalid()))
        .collect::<Result<_, _>>()?;

    parts.try_into().map_err(|_| invalid())
}

impl fmt::Display for HueSat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.hue, self.saturation)
    }
}

impl FromStr for HueSat {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [hue, saturation] = parse_parts::<f64, 2>("hue/saturation", s)?;
        Ok(Self { hue, saturation })
    }
}

impl fmt::Display for Xy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Xy {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_parts::<f64, 2>("xy", s)?;
        Ok(Self { x, y })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [r, g, b] = parse_parts::<u8, 3>("rgb", s)?;
        Ok(Self { r, g, b })
    }
}

impl fmt::Display for Rgbw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, self.w)
    }
}

impl FromStr for Rgbw {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [r, g, b, w] = parse_parts::<u8, 4>("rgbw", s)?;
        Ok(Self { r, g, b, w })
    }
}

impl fmt::Display for Rgbww {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{},{}", self.r, self.g, self.b, self.cw, self.ww)
    }
}

impl FromStr for Rgbww {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [r, g, b, cw, ww] = parse_parts::<u8, 5>("rgbww", s)?;
        Ok(Self { r, g, b, cw, ww })
    }
}

/// A color payload that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} color: {input:?}")]
pub struct ColorParseError {
    kind: &'static str,
    input: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassync_core::codec::{display_marshaler, from_str_unmarshaler};

    #[test]
    fn rgb_wire_form() {
        let rgb: Rgb = "255, 128,0".parse().unwrap();
        assert_eq!(rgb, Rgb { r: 255, g: 128, b: 0 });
        assert_eq!(rgb.to_string(), "255,128,0");
        assert_eq!(rgb.hex(), "#ff8000");

        assert!("255,128".parse::<Rgb>().is_err());
        assert!("256,0,0".parse::<Rgb>().is_err());
        assert!("1,2,3,4".parse::<Rgb>().is_err());
    }

    #[test]
    fn white_channels() {
        let rgbww: Rgbww = "1,2,3,4,5".parse().unwrap();
        assert_eq!(rgbww.cw, 4);
        assert_eq!(rgbww.ww, 5);
        assert_eq!(rgbww.hex(), "#0102030405");

        let rgbw: Rgbw = "1,2,3,4".parse().unwrap();
        assert_eq!(rgbw.to_string(), "1,2,3,4");
    }

    #[test]
    fn float_pairs() {
        let hs = from_str_unmarshaler::<HueSat>()(b"30.5,100").unwrap();
        assert_eq!(hs, HueSat { hue: 30.5, saturation: 100.0 });
        assert_eq!(display_marshaler::<HueSat>()(&hs).unwrap(), b"30.5,100");

        let xy: Xy = "0.3,0.32".parse().unwrap();
        assert_eq!(xy, Xy { x: 0.3, y: 0.32 });
        assert!("0.3".parse::<Xy>().is_err());
    }
}
