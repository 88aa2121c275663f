use std::path::PathBuf;

use clap::Parser;
use coloriz_localizer::Locale;

/// Provides getters for the bot's environment secrets.
pub mod env;
/// Provides type extension traits.
pub mod ext;

coloriz_macros::global! {
    /// The bot's command-line arguments.
    pub static ARGUMENTS: Arguments = Arguments::parse();
}

/// Discord content delivery network endpoint base URL.
pub const CDN_URL: &str = "https://cdn.discordapp.com";
/// The public, searchable list of every named color.
pub const COLOR_LIST_URL: &str = "https://unpkg.com/color-name-list/dist/colornames.html";

/// The bot's branding color.
pub const BRANDING: u32 = 0x24_9F_DE;
/// The bot's success color.
pub const SUCCESS: u32 = 0x59_C1_35;
/// The bot's failure color.
pub const FAILURE: u32 = 0xB4_20_2A;

/// Wraps an [`anyhow::Result<T, E>`], providing a defaulted `T` generic type.
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// The bot's command-line arguments.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(author, about, version)]
pub struct Arguments {
    /// Disables logger printing.
    #[arg(short = 'q', long = "quiet")]
    pub log_no_print: bool,
    /// Disables log file writing.
    #[arg(short = 'e', long = "ephemeral")]
    pub log_no_write: bool,
    /// Disables colored logger output.
    #[arg(long = "no-color")]
    pub log_no_color: bool,
    /// Enables debug logs.
    #[arg(short = 'v', long = "verbose")]
    pub log_verbose: bool,

    /// The bot's preferred locale.
    #[arg(short = 'l', long = "preferred-locale")]
    pub lang_prefer_locale: Option<Locale>,

    /// The directory to store log files within.
    #[arg(long = "log-directory")]
    pub log_write_dir: Option<PathBuf>,
    /// The directory that contains the bot's localization files.
    #[arg(short = 'L', long = "lang-directory")]
    pub lang_file_dir: Option<PathBuf>,
    /// The directory to store member color histories within.
    #[arg(short = 'd', long = "data-directory")]
    pub data_file_dir: Option<PathBuf>,
    /// The CSV file of named colors, with `name` and `hex` columns.
    #[arg(short = 'c', long = "color-names", default_value = "res/colornames.csv")]
    pub color_names: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let arguments = Arguments::try_parse_from(["coloriz", "-q", "--no-color", "-l", "de", "-c", "names.csv"]).unwrap();

        assert!(arguments.log_no_print);
        assert!(!arguments.log_no_write);
        assert!(arguments.log_no_color);
        assert!(!arguments.log_verbose);
        assert_eq!(arguments.lang_prefer_locale, Some(Locale::German));
        assert_eq!(arguments.color_names, PathBuf::from("names.csv"));
    }

    #[test]
    fn defaults_color_names() {
        let arguments = Arguments::try_parse_from(["coloriz"]).unwrap();

        assert_eq!(arguments.color_names, PathBuf::from("res/colornames.csv"));
        assert_eq!(arguments.data_file_dir, None);
    }
}
