//! Implements a content localizer for the coloriz Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

use coloriz_logger::{info, warn};

pub use crate::locale::*;

mod locale;

/// The text assigned to each key in one locale.
pub type Content = HashMap<Box<str>, Box<str>>;

/// The installed localizer.
static LOCALIZER: OnceLock<Localizer> = OnceLock::new();

/// Returns the installed localizer.
///
/// Until [`install`] is called this is an empty localizer that resolves every key to itself.
pub fn localizer() -> &'static Localizer {
    static EMPTY: OnceLock<Localizer> = OnceLock::new();

    LOCALIZER.get().unwrap_or_else(|| EMPTY.get_or_init(Localizer::default))
}

/// Loads every locale file in the given directory and installs the result, returning `false` if a
/// localizer was already installed.
pub fn install(prefer: Locale, dir: impl AsRef<Path>) -> bool {
    let localizer = Localizer::new(prefer, dir);
    let mut loaded = localizer.content.keys().map(|locale| locale.key()).collect::<Vec<_>>();

    loaded.sort_unstable();

    info!("loaded {} locales: {}", loaded.len(), loaded.join(", ")).ok();

    if !localizer.content.contains_key(&prefer) {
        warn!("the preferred locale '{}' has no localization file", prefer.key()).ok();
    }

    LOCALIZER.set(localizer).is_ok()
}

/// Resolves text keys in any supported locale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Localizer {
    prefer: Locale,
    content: HashMap<Locale, Content>,
}

impl Localizer {
    /// Creates a new [`Localizer`] from the `<locale>.json` files in the given directory.
    ///
    /// Missing files are skipped, and malformed files are skipped with a warning.
    #[must_use]
    pub fn new(prefer: Locale, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut content = HashMap::new();

        for &locale in Locale::LIST {
            let Ok(file) = File::open(dir.join(format!("{}.json", locale.key()))) else {
                continue;
            };

            match serde_json::from_reader::<_, Content>(BufReader::new(file)) {
                Ok(map) => {
                    content.insert(locale, map);
                }
                Err(error) => {
                    warn!("skipped malformed locale '{}': {error}", locale.key()).ok();
                }
            }
        }

        Self { prefer, content }
    }

    /// Creates a new [`Localizer`] from in-memory content maps.
    #[must_use]
    pub fn from_content(prefer: Locale, content: HashMap<Locale, Content>) -> Self {
        Self { prefer, content }
    }

    /// Returns the locale used when a request does not name one.
    #[must_use]
    pub const fn preferred_locale(&self) -> &Locale {
        &self.prefer
    }

    /// Returns the text of a key in a single locale.
    fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.content.get(&locale)?.get(key).map(|text| &**text)
    }

    /// Returns a key's text in the preferred locale, or the key itself.
    pub fn localize_preferred(&self, key: impl AsRef<str>) -> Box<str> {
        self.localize(self.prefer, key)
    }

    /// Returns a key's text in the given locale, or the key itself.
    pub fn localize(&self, locale: Locale, key: impl AsRef<str>) -> Box<str> {
        let key = key.as_ref();

        self.lookup(locale, key).unwrap_or(key).into()
    }

    /// Returns a key's text in the given locale, then in the preferred locale, or the key itself.
    pub fn maybe_localize(&self, locale: Locale, key: impl AsRef<str>) -> Box<str> {
        let key = key.as_ref();
        let text = self.lookup(locale, key).or_else(|| self.lookup(self.prefer, key));

        text.unwrap_or(key).into()
    }

    /// Returns every loaded translation of a key, keyed by locale code.
    pub fn localizations(&self, key: impl AsRef<str>) -> HashMap<String, String> {
        let key = key.as_ref();

        let translations = self.content.keys().filter_map(|&locale| {
            let text = self.lookup(locale, key)?;

            Some((locale.key().to_string(), text.to_string()))
        });

        translations.collect()
    }
}

/// Replaces every `{name}` placeholder in the given text with its assigned value.
///
/// The template is scanned once, so braces inside substituted values are never expanded. Unknown
/// placeholders are left untouched.
#[must_use]
pub fn fill<D: std::fmt::Display>(text: &str, values: &[(&str, D)]) -> String {
    let mut filled = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[.. start]);
        rest = &rest[start ..];

        let Some(end) = rest[1 ..].find(['{', '}']).map(|end| end + 1) else {
            break;
        };
        let value = (rest.as_bytes()[end] == b'}')
            .then(|| values.iter().find(|(name, _)| *name == &rest[1 .. end]))
            .flatten();

        match value {
            Some((_, value)) => {
                filled.push_str(&value.to_string());
                rest = &rest[end + 1 ..];
            }
            // copy the brace and keep scanning after it
            None => {
                filled.push('{');
                rest = &rest[1 ..];
            }
        }
    }

    filled.push_str(rest);
    filled
}

/// Fetches the given key's assigned text from the [`Localizer`].
///
/// # Examples
///
/// ```ignore
/// // Returns the text in the default locale.
/// localize!("command.color.name");
/// // Returns the text in German.
/// localize!(in Locale::German, "command.color.name");
/// // Returns the text in German, or in the default locale if German does not define it.
/// localize!(try in Locale::German, "command.color.name");
///
/// // Returns a map of the text in all containing locales.
/// localize!(in *, "command.color.name");
/// ```
#[macro_export]
macro_rules! localize {
    ($(try)? in *, $($args:tt)+) => {
        $crate::localizer().localizations(format!($($args)+))
    };
    (try in $locale:expr, $($args:tt)+) => {
        $crate::localizer().maybe_localize($locale, format!($($args)+))
    };
    (in $locale:expr, $($args:tt)+) => {
        $crate::localizer().localize($locale, format!($($args)+))
    };
    ($($args:tt)+) => {
        $crate::localizer().localize_preferred(format!($($args)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Localizer {
        let english = HashMap::from([
            ("command.color.name".into(), "color".into()),
            ("failure.name_not_found.title".into(), "Unknown color".into()),
        ]);
        let german = HashMap::from([("command.color.name".into(), "farbe".into())]);

        Localizer::from_content(
            Locale::EnglishUS,
            HashMap::from([(Locale::EnglishUS, english), (Locale::German, german)]),
        )
    }

    #[test]
    fn missing_keys_resolve_to_themselves() {
        let localizer = sample();

        assert_eq!(&*localizer.localize(Locale::EnglishUS, "text.missing"), "text.missing");
        assert_eq!(&*localizer.localize(Locale::French, "command.color.name"), "command.color.name");
    }

    #[test]
    fn falls_back_to_preferred_locale() {
        let localizer = sample();

        assert_eq!(&*localizer.maybe_localize(Locale::German, "command.color.name"), "farbe");
        assert_eq!(
            &*localizer.maybe_localize(Locale::German, "failure.name_not_found.title"),
            "Unknown color"
        );
        assert_eq!(&*localizer.maybe_localize(Locale::French, "command.color.name"), "color");
    }

    #[test]
    fn collects_all_translations() {
        let map = sample().localizations("command.color.name");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("de").map(String::as_str), Some("farbe"));
    }

    #[test]
    fn loads_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(dir.path().join("en-US.json"), r#"{ "text.help.title": "Help" }"#).unwrap();
        std::fs::write(dir.path().join("fr.json"), "not json").unwrap();

        let localizer = Localizer::new(Locale::EnglishUS, dir.path());

        assert_eq!(&*localizer.localize_preferred("text.help.title"), "Help");
        assert_eq!(localizer.localizations("text.help.title").len(), 1);
    }

    #[test]
    fn fills_placeholders() {
        let text = fill("'{input}' is not a named color", &[("input", "sky bleu")]);

        assert_eq!(text, "'sky bleu' is not a named color");
        assert_eq!(fill("{other}", &[("input", 1)]), "{other}");
    }

    #[test]
    fn filled_values_are_not_expanded() {
        let values = [("input", "{results}"), ("total", "2"), ("results", "- Sky Blue\n- Deep Sky Blue")];
        let text = fill("Colors matching `{input}` ({total}):\n\n{results}", &values);

        assert_eq!(text, "Colors matching `{results}` (2):\n\n- Sky Blue\n- Deep Sky Blue");
        assert_eq!(fill("{{input}} {input", &[("input", "a")]), "{a} {input");
        assert_eq!(fill("}{", &[("input", "a")]), "}{");
    }
}
