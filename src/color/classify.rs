use regex::Regex;

use super::{parse_hex, parse_triplet, ColorError, NameTable, Rgb};

coloriz_macros::global! {
    /// Matches inputs shaped like a list of numbers.
    #[allow(clippy::unwrap_used)] // the pattern is a valid constant
    static NUMERIC_SHAPE: Regex = Regex::new("[0-9]+[^0-9]+[0-9]").unwrap();
}

/// Joins raw input tokens with single spaces, dropping blank tokens.
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    let tokens = tokens.iter().map(|t| t.as_ref().trim()).filter(|t| !t.is_empty());

    tokens.collect::<Vec<_>>().join(" ")
}

/// Resolves free-form input to a color.
///
/// Input starting with `#` is always a hex color. Otherwise, input containing two numbers with
/// something between them is always a triplet. Anything else is looked up as a color name.
///
/// # Errors
///
/// This function will return an error from whichever grammar the input was classified as.
pub fn classify<S: AsRef<str>>(table: &NameTable, tokens: &[S]) -> Result<Rgb, ColorError> {
    let input = self::join(tokens);

    if input.starts_with('#') {
        parse_hex(&input)
    } else if numeric_shape().is_match(&input) {
        parse_triplet(&input)
    } else {
        table.exact(&input)?.rgb()
    }
}
