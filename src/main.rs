//! A Discord bot that lets server members pick their own color.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::path::Path;

use coloriz_logger::{info, warn, Level};

use crate::bot::BotClient;
use crate::color::{names, NameTable};
use crate::util::{arguments, Result};

/// The bot's gateway client and event handlers.
pub mod bot;
/// The bot's slash commands.
pub mod cmd;
/// Color parsing, naming and history.
pub mod color;
/// Shared constants, arguments and extensions.
pub mod util;

/// The default directory for log files.
pub const LOG_DIR: &str = "logs";
/// The default directory for localization files.
pub const LANG_DIR: &str = "res/lang";

#[tokio::main]
async fn main() -> Result {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    let arguments = arguments();
    let mut config = coloriz_logger::Config {
        print: !arguments.log_no_print,
        write: !arguments.log_no_write,
        color: !arguments.log_no_color,
        ..Default::default()
    };

    if arguments.log_verbose {
        config.level = Level::Debug;
    }

    let log_dir = arguments.log_write_dir.as_deref().unwrap_or_else(|| Path::new(LOG_DIR));
    let _logger = coloriz_logger::install(config, log_dir)?;

    let lang_dir = arguments.lang_file_dir.as_deref().unwrap_or_else(|| Path::new(LANG_DIR));
    let locale = arguments.lang_prefer_locale.unwrap_or_default();

    coloriz_localizer::install(locale, lang_dir);

    if let Some(ref dir) = arguments.data_file_dir {
        coloriz_storage::set_root(dir);
    }

    let table = NameTable::load(&arguments.color_names)?;

    info!("loaded {} named colors from '{}'", table.len(), arguments.color_names.display())?;

    if table.rejected() > 0 || table.duplicates() > 0 {
        let (rejected, duplicates) = (table.rejected(), table.duplicates());

        warn!("skipped {rejected} invalid and {duplicates} duplicate named colors")?;
    }
    if names::install(table).is_err() {
        warn!("the named color table was already installed")?;
    }

    BotClient::new().await?.start().await
}
