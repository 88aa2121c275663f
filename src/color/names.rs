use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use super::{format_hex, parse_hex, ColorError, Rgb};
use crate::util::Result;

/// The installed name table.
static TABLE: OnceLock<NameTable> = OnceLock::new();

/// Installs the global name table, returning it back if one was already installed.
///
/// # Errors
///
/// This function will return an error if a table was already installed.
pub fn install(table: NameTable) -> Result<(), NameTable> {
    TABLE.set(table)
}

/// Returns the global name table, if one has been installed.
#[must_use]
pub fn table() -> Option<&'static NameTable> {
    TABLE.get()
}

/// Strips diacritics and drops any remaining non-ASCII characters.
fn transliterate(text: &str) -> String {
    text.nfd().filter(char::is_ascii).collect()
}

/// Returns the lookup key for a color name.
///
/// Names are transliterated to ASCII, runs of whitespace and underscores become a single space,
/// and letters are lowercased.
#[must_use]
pub fn normalize(name: &str) -> String {
    let ascii = self::transliterate(name).to_ascii_lowercase();
    let words = ascii.split(|c: char| c.is_ascii_whitespace() || c == '_');

    words.filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ")
}

/// A single named color.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ColorEntry {
    /// The normalized lookup key.
    pub name: Box<str>,
    /// The name as written in the dataset, transliterated to ASCII.
    pub display: Box<str>,
    /// The canonical `#RRGGBB` value.
    pub hex: Box<str>,
}

impl ColorEntry {
    /// Returns the entry's color.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored hex is invalid, which the table never
    /// allows.
    pub fn rgb(&self) -> Result<Rgb, ColorError> {
        parse_hex(&self.hex)
    }
}

/// A dataset row.
#[derive(Debug, Deserialize)]
struct Record {
    name: String,
    hex: String,
}

/// An immutable list of named colors, sorted by their normalized names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameTable {
    /// The sorted, de-duplicated entries.
    entries: Box<[ColorEntry]>,
    /// The number of records dropped for having an invalid hex value or an empty name.
    rejected: usize,
    /// The number of records dropped for repeating an earlier name.
    duplicates: usize,
}

impl NameTable {
    /// Builds a table from `(name, hex)` records.
    ///
    /// When several records share a normalized name, the first one is kept.
    pub fn new<N, H>(records: impl IntoIterator<Item = (N, H)>) -> Self
    where
        N: AsRef<str>,
        H: AsRef<str>,
    {
        let mut rejected = 0;
        let mut entries = records
            .into_iter()
            .filter_map(|(name, hex)| {
                let name = name.as_ref();
                let key = self::normalize(name);

                match parse_hex(hex.as_ref().trim()) {
                    Ok(color) if !key.is_empty() => Some(ColorEntry {
                        name: key.into(),
                        display: self::transliterate(name).trim().into(),
                        hex: format_hex(color).into(),
                    }),
                    _ => {
                        rejected += 1;
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        // stable, so the first record of each name stays in front
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let total = entries.len();

        entries.dedup_by(|later, earlier| later.name == earlier.name);

        let duplicates = total - entries.len();

        Self { entries: entries.into_boxed_slice(), rejected, duplicates }
    }

    /// Reads a table from CSV data with a header row containing `name` and `hex` columns.
    ///
    /// # Errors
    ///
    /// This function will return an error if the data is not valid CSV or lacks the columns.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let records = reader.deserialize::<Record>().collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(records.into_iter().map(|Record { name, hex }| (name, hex))))
    }

    /// Reads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file could not be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of records rejected while building.
    #[must_use]
    pub const fn rejected(&self) -> usize {
        self.rejected
    }

    /// Returns the number of duplicate records dropped while building.
    #[must_use]
    pub const fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Returns the entries in sorted order.
    #[must_use]
    pub fn entries(&self) -> &[ColorEntry] {
        &self.entries
    }

    /// Finds the entry whose name matches the query exactly, after normalization.
    ///
    /// # Errors
    ///
    /// This function will return an error carrying the original query if no entry matches.
    pub fn exact(&self, query: &str) -> Result<&ColorEntry, ColorError> {
        let key = self::normalize(query);

        match self.entries.binary_search_by(|entry| (*entry.name).cmp(&key)) {
            Ok(index) => Ok(&self.entries[index]),
            Err(_) => Err(ColorError::NameNotFound(query.into())),
        }
    }

    /// Returns every entry whose name contains the fragment, in table order.
    pub fn search<'t>(&'t self, fragment: &str) -> impl Iterator<Item = &'t ColorEntry> + 't {
        let key = self::normalize(fragment);

        self.entries.iter().filter(move |entry| entry.name.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn primaries() -> NameTable {
        NameTable::new([("red", "#FF0000"), ("Green", "#00ff00"), ("blue", "#0000FF")])
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize("Sky  Blue"), "sky blue");
        assert_eq!(normalize("sky_blue"), "sky blue");
        assert_eq!(normalize(" _Café\tau  Lait_ "), "cafe au lait");
        assert_eq!(normalize("ドラゴン"), "");
    }

    #[test]
    fn entries_are_sorted() {
        let table = primaries();
        let names = table.entries().iter().map(|e| &*e.name).collect::<Vec<_>>();

        assert_eq!(names, ["blue", "green", "red"]);
        assert_eq!(&*table.entries()[1].display, "Green");
        assert_eq!(&*table.entries()[1].hex, "#00FF00");
    }

    #[test]
    fn exact_lookup() {
        let table = primaries();

        assert_eq!(&*table.exact("green").unwrap().hex, "#00FF00");
        assert_eq!(&*table.exact("  GREEN ").unwrap().hex, "#00FF00");
        assert_eq!(table.exact("purple"), Err(ColorError::NameNotFound("purple".into())));
    }

    #[test]
    fn first_duplicate_wins() {
        let table = NameTable::new([("Sky Blue", "#87CEEB"), ("red", "#FF0000"), ("sky_blue", "#000001")]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicates(), 1);
        assert_eq!(&*table.exact("sky blue").unwrap().hex, "#87CEEB");
    }

    #[test]
    fn invalid_records_are_rejected() {
        let table = NameTable::new([("red", "#FF0000"), ("broken", "FF0000"), ("", "#000000"), ("odd", "#12345")]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rejected(), 3);
    }

    #[test]
    fn search_returns_table_order() {
        let table = NameTable::new([("Sky Blue", "#87CEEB"), ("Blue", "#0000FF"), ("Red", "#FF0000")]);
        let found = table.search("BLUE").map(|e| &*e.display).collect::<Vec<_>>();

        assert_eq!(found, ["Blue", "Sky Blue"]);
        assert_eq!(table.search("purple").count(), 0);
    }

    #[test]
    fn reads_csv_with_extra_columns() {
        let data = "name,hex,good name\nAbsolute Zero,#0048ba,x\nAcid Green,#b0bf1a,\nNope,#zzzzzz,\n";
        let table = NameTable::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rejected(), 1);
        assert_eq!(table.exact("acid green").unwrap().rgb(), Ok(Rgb::new(0xB0, 0xBF, 0x1A)));
    }

    #[test]
    fn loads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();

        writeln!(file, "name,hex\nCafé au Lait,#A67B5B").unwrap();

        let table = NameTable::load(file.path()).unwrap();

        assert_eq!(&*table.exact("cafe au lait").unwrap().display, "Cafe au Lait");
        assert!(NameTable::load(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn loads_the_bundled_dataset() {
        let table = NameTable::load(concat!(env!("CARGO_MANIFEST_DIR"), "/res/colornames.csv")).unwrap();

        assert_eq!(table.rejected(), 0);
        assert_eq!(&*table.exact("sky blue").unwrap().hex, "#87CEEB");
    }

    #[test]
    fn csv_without_hex_column_fails() {
        assert!(NameTable::from_reader("name\nred\n".as_bytes()).is_err());
    }
}
