use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use self::classify::classify;
pub use self::hex::{format_hex, parse_hex};
pub use self::names::{ColorEntry, NameTable};
pub use self::triplet::parse_triplet;

/// Decides which grammar a free-form input belongs to.
pub mod classify;
/// Member color history and duration statistics.
pub mod history;
/// Parses and formats `#RRGGBB` strings.
pub mod hex;
/// The sorted named-color table.
pub mod names;
/// Parses three-number RGB inputs.
pub mod triplet;

/// A color input that could not be resolved.
///
/// Each variant carries the offending input, or the offending token for
/// [`TripletOutOfRange`](<ColorError::TripletOutOfRange>).
#[derive(Clone, Debug, Hash, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    /// The hex string is not exactly seven characters long.
    #[error("'{0}' must be a '#' followed by six hex digits")]
    NotHexLength(Box<str>),
    /// The hex string does not start with `#`.
    #[error("'{0}' must start with '#'")]
    NotHexPrefix(Box<str>),
    /// The hex string contains a non-hexadecimal character.
    #[error("'{0}' contains characters that are not hex digits")]
    InvalidHexDigits(Box<str>),
    /// The input does not contain exactly three numbers.
    #[error("'{0}' must contain exactly three numbers")]
    WrongTripletCount(Box<str>),
    /// A number is above 255.
    #[error("'{0}' is not between 0 and 255")]
    TripletOutOfRange(Box<str>),
    /// No named color matches the input.
    #[error("'{0}' is not a named color")]
    NameNotFound(Box<str>),
}

impl ColorError {
    /// Returns the localization group for this error.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::NotHexLength(_) => "not_hex_length",
            Self::NotHexPrefix(_) => "not_hex_prefix",
            Self::InvalidHexDigits(_) => "invalid_hex_digits",
            Self::WrongTripletCount(_) => "wrong_triplet_count",
            Self::TripletOutOfRange(_) => "triplet_out_of_range",
            Self::NameNotFound(_) => "name_not_found",
        }
    }

    /// Returns the input that caused this error.
    #[must_use]
    pub fn input(&self) -> &str {
        match self {
            Self::NotHexLength(input)
            | Self::NotHexPrefix(input)
            | Self::InvalidHexDigits(input)
            | Self::WrongTripletCount(input)
            | Self::TripletOutOfRange(input)
            | Self::NameNotFound(input) => input,
        }
    }
}

/// An RGB color.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(u8, u8, u8);

impl Rgb {
    /// Creates a new color from its components.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Returns a uniformly random color.
    #[must_use]
    pub fn random() -> Self {
        rand::thread_rng().gen::<[u8; 3]>().into()
    }

    /// Returns the red component.
    #[inline]
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0
    }

    /// Returns the green component.
    #[inline]
    #[must_use]
    pub const fn g(self) -> u8 {
        self.1
    }

    /// Returns the blue component.
    #[inline]
    #[must_use]
    pub const fn b(self) -> u8 {
        self.2
    }

    /// Returns the canonical `#RRGGBB` form of this color.
    #[inline]
    #[must_use]
    pub fn hex(self) -> String {
        self::format_hex(self)
    }
}

impl From<u32> for Rgb {
    fn from(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();

        Self(r, g, b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self(r, g, b)
    }
}

impl From<Rgb> for u32 {
    fn from(Rgb(r, g, b): Rgb) -> Self {
        Self::from_be_bytes([0, r, g, b])
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_positional() {
        let color = Rgb::new(1, 2, 3);

        assert_eq!((color.r(), color.g(), color.b()), (1, 2, 3));
        assert_eq!(color.to_string(), "rgb(1, 2, 3)");
    }

    #[test]
    fn packs_into_discord_colors() {
        assert_eq!(u32::from(Rgb::new(0x24, 0x9F, 0xDE)), 0x24_9F_DE);
        assert_eq!(Rgb::from(0xFF_24_9F_DE), Rgb::new(0x24, 0x9F, 0xDE));
    }

    #[test]
    fn errors_keep_their_input() {
        let error = ColorError::TripletOutOfRange("300".into());

        assert_eq!(error.input(), "300");
        assert_eq!(error.key(), "triplet_out_of_range");
        assert_eq!(error.to_string(), "'300' is not between 0 and 255");
    }
}
