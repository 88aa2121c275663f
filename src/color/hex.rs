use super::{ColorError, Rgb};

/// The length of a canonical hex color, in characters.
pub const HEX_LENGTH: usize = 7;

/// Parses a `#RRGGBB` string, accepting either letter case.
///
/// The prefix is checked first, then the length, then the digits.
///
/// # Errors
///
/// This function will return an error if the string is not a valid hex color.
pub fn parse_hex(input: &str) -> Result<Rgb, ColorError> {
    let Some(digits) = input.strip_prefix('#') else {
        return Err(ColorError::NotHexPrefix(input.into()));
    };

    // counted in characters so that multi-byte input cannot pass as six bytes
    if input.chars().count() != HEX_LENGTH {
        return Err(ColorError::NotHexLength(input.into()));
    }

    let component = |index: usize| {
        digits
            .get(index .. index + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(|| ColorError::InvalidHexDigits(input.into()))
    };

    // `from_str_radix` tolerates a leading '+', which is not a hex digit
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHexDigits(input.into()));
    }

    Ok(Rgb::new(component(0)?, component(2)?, component(4)?))
}

/// Formats a color as an uppercase `#RRGGBB` string.
#[must_use]
pub fn format_hex(color: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r(), color.g(), color.b())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case() {
        assert_eq!(parse_hex("#1A2b3C"), Ok(Rgb::new(26, 43, 60)));
        assert_eq!(parse_hex("#ffffff"), Ok(Rgb::new(255, 255, 255)));
        assert_eq!(parse_hex("#000000"), Ok(Rgb::new(0, 0, 0)));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(parse_hex("1A2b3C"), Err(ColorError::NotHexPrefix("1A2b3C".into())));
        assert_eq!(parse_hex(""), Err(ColorError::NotHexPrefix("".into())));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(parse_hex("#1A2b3"), Err(ColorError::NotHexLength("#1A2b3".into())));
        assert_eq!(parse_hex("#1A2b3C4"), Err(ColorError::NotHexLength("#1A2b3C4".into())));
        assert_eq!(parse_hex("#"), Err(ColorError::NotHexLength("#".into())));
    }

    #[test]
    fn length_counts_characters() {
        // six characters, but more than six bytes
        assert_eq!(parse_hex("#éééééé"), Err(ColorError::InvalidHexDigits("#éééééé".into())));
        assert_eq!(parse_hex("#ééé"), Err(ColorError::NotHexLength("#ééé".into())));
    }

    #[test]
    fn rejects_invalid_digits() {
        assert_eq!(parse_hex("#1A2b3G"), Err(ColorError::InvalidHexDigits("#1A2b3G".into())));
        assert_eq!(parse_hex("#+12345"), Err(ColorError::InvalidHexDigits("#+12345".into())));
        assert_eq!(parse_hex("# 12345"), Err(ColorError::InvalidHexDigits("# 12345".into())));
    }

    #[test]
    fn formats_uppercase() {
        assert_eq!(format_hex(Rgb::new(26, 43, 60)), "#1A2B3C");
        assert_eq!(format_hex(Rgb::new(0, 15, 255)), "#000FFF");
    }

    #[test]
    fn formatting_is_case_insensitive_inverse() {
        for input in ["#1a2b3c", "#FFFFFF", "#00fF7e", "#C0FFEE"] {
            let parsed = parse_hex(input).unwrap();

            assert!(format_hex(parsed).eq_ignore_ascii_case(input));
        }
    }
}
