use regex::Regex;

use super::{ColorError, Rgb};

coloriz_macros::global! {
    /// Matches a single triplet component.
    #[allow(clippy::unwrap_used)] // the pattern is a valid constant
    static COMPONENT: Regex = Regex::new("[0-9]{1,3}").unwrap();
}

/// Parses three decimal numbers separated by anything that is not a digit.
///
/// Digit runs longer than three characters are split into several numbers.
///
/// # Errors
///
/// This function will return an error if there are not exactly three numbers, or if a number is
/// above 255.
pub fn parse_triplet(input: &str) -> Result<Rgb, ColorError> {
    let tokens = component().find_iter(input).map(|m| m.as_str()).collect::<Vec<_>>();

    let &[r, g, b] = tokens.as_slice() else {
        return Err(ColorError::WrongTripletCount(input.into()));
    };

    let parse = |token: &str| token.parse::<u8>().map_err(|_| ColorError::TripletOutOfRange(token.into()));

    Ok(Rgb::new(parse(r)?, parse(g)?, parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_any_separator() {
        assert_eq!(parse_triplet("255,0 128"), Ok(Rgb::new(255, 0, 128)));
        assert_eq!(parse_triplet("rgb(1; 2 / 3)"), Ok(Rgb::new(1, 2, 3)));
        assert_eq!(parse_triplet("007 08 9"), Ok(Rgb::new(7, 8, 9)));
    }

    #[test]
    fn requires_three_numbers() {
        assert_eq!(parse_triplet("10 20"), Err(ColorError::WrongTripletCount("10 20".into())));
        assert_eq!(parse_triplet("1 2 3 4"), Err(ColorError::WrongTripletCount("1 2 3 4".into())));
        assert_eq!(parse_triplet(""), Err(ColorError::WrongTripletCount("".into())));
    }

    #[test]
    fn long_runs_split_into_tokens() {
        assert_eq!(parse_triplet("100200 3"), Ok(Rgb::new(100, 200, 3)));
        assert_eq!(parse_triplet("1000 2"), Ok(Rgb::new(100, 0, 2)));
    }

    #[test]
    fn reports_first_out_of_range_token() {
        assert_eq!(parse_triplet("300 0 0"), Err(ColorError::TripletOutOfRange("300".into())));
        assert_eq!(parse_triplet("0 256 999"), Err(ColorError::TripletOutOfRange("256".into())));
    }
}
