use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Declares the [`Locale`] enum from a list of Discord locale keys.
///
/// Each entry pairs the key Discord reports for a client with the language's native name.
macro_rules! locales {
    {$(
        #[doc = $native:literal]
        $(#[$attribute:meta])*
        $key:literal as $name:ident
    ),* $(,)?} => {
        /// The locales supported by Discord clients.
        #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
        pub enum Locale {$(
            $(#[$attribute])*
            #[doc = $native]
            #[serde(rename = $key)]
            #[value(name = $key)]
            $name,
        )*}

        impl Locale {
            /// Every supported locale, in declaration order.
            pub const LIST: &'static [Self] = &[$(Self::$name),*];

            /// Returns the locale's Discord key, which is also its localization file stem.
            #[must_use]
            pub const fn key(self) -> &'static str {
                match self {$( Self::$name => $key, )*}
            }

            /// Returns the language's name, written in that language.
            #[must_use]
            pub const fn native_name(self) -> &'static str {
                match self {$( Self::$name => $native, )*}
            }

            /// Returns the locale with the given Discord key.
            pub fn get(key: impl AsRef<str>) -> Option<Self> {
                match key.as_ref() {
                    $( $key => Some(Self::$name), )*
                    _ => None,
                }
            }
        }
    };
}

locales! {
    /// Dansk
    "da" as Danish,
    /// Deutsch
    "de" as German,
    /// English, UK
    "en-GB" as EnglishUK,
    /// English, US
    #[default]
    "en-US" as EnglishUS,
    /// Español
    "es-ES" as Spanish,
    /// Français
    "fr" as French,
    /// Italiano
    "it" as Italian,
    /// Nederlands
    "nl" as Dutch,
    /// Norsk
    "no" as Norwegian,
    /// Polski
    "pl" as Polish,
    /// Português do Brasil
    "pt-BR" as PortugueseBR,
    /// Suomi
    "fi" as Finnish,
    /// Svenska
    "sv-SE" as Swedish,
    /// Türkçe
    "tr" as Turkish,
    /// Pусский
    "ru" as Russian,
    /// 日本語
    "ja" as Japanese,
    /// 한국어
    "ko" as Korean,
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.native_name(), self.key())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::get(value).ok_or_else(|| UnknownLocale(value.into()))
    }
}

/// Returned when a string is not a supported Discord locale key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownLocale(pub Box<str>);

impl Display for UnknownLocale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown locale '{}'", self.0)
    }
}

impl std::error::Error for UnknownLocale {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for locale in Locale::LIST {
            assert_eq!(Locale::get(locale.key()), Some(*locale));
        }
    }

    #[test]
    fn parses_discord_keys() {
        assert_eq!("en-US".parse(), Ok(Locale::EnglishUS));
        assert_eq!("pt-BR".parse(), Ok(Locale::PortugueseBR));
        assert_eq!("en_us".parse::<Locale>(), Err(UnknownLocale("en_us".into())));
    }

    #[test]
    fn defaults_to_american_english() {
        assert_eq!(Locale::default(), Locale::EnglishUS);
        assert_eq!(Locale::default().to_string(), "English, US (en-US)");
    }
}
