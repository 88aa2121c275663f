//! Implements a terminal and file system logger for the coloriz Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

pub use crossbeam_channel::SendError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use owo_colors::{OwoColorize, Stream};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// The logging thread's sender channel.
static SENDER: OnceLock<Sender<Message>> = OnceLock::new();

/// Sends a message to the logging thread.
fn send(message: Message) -> Result<(), SendError<Message>> {
    match SENDER.get() {
        Some(sender) => sender.send(message),
        None => Err(SendError(message)),
    }
}

/// Queues a log.
///
/// # Errors
///
/// This function will return an error if the logging thread is closed or was never installed.
pub fn queue(level: Level, text: impl Display) -> Result<(), SendError<Message>> {
    self::send(Message::Queue(Log::new(self::now(), level, text)))
}

/// Asks the logging thread to output every queued log.
///
/// # Errors
///
/// This function will return an error if the logging thread is closed or was never installed.
pub fn flush() -> Result<(), SendError<Message>> {
    self::send(Message::Flush)
}

/// Starts the logging thread, writing log files into the given directory.
///
/// The returned handle must be kept alive; dropping it closes and joins the logging thread.
///
/// # Errors
///
/// This function will return an error if the thread cannot be spawned or a logging thread has
/// already been installed.
pub fn install(config: Config, dir: impl AsRef<Path>) -> std::io::Result<LogThread> {
    let logger = Logger::new(config, dir);
    let (sender, receiver) = crossbeam_channel::unbounded();

    if SENDER.set(sender.clone()).is_err() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "the logging thread has already been installed",
        ));
    }

    let handle = Builder::new().name("logger".to_string()).spawn(move || run(logger, &receiver))?;

    Ok(LogThread { sender, handle: Some(handle) })
}

/// Returns the current local time, or UTC if the local offset is unknown.
fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// The logging thread's main loop.
fn run(mut logger: Logger, receiver: &Receiver<Message>) -> std::io::Result<()> {
    loop {
        match receiver.recv_timeout(logger.config.stale_time) {
            Ok(Message::Queue(log)) => logger.queue(log)?,
            Ok(Message::Flush) | Err(RecvTimeoutError::Timeout) => logger.flush()?,
            Ok(Message::Close) | Err(RecvTimeoutError::Disconnected) => return logger.flush(),
        }
    }
}

/// A handle to the running logging thread.
///
/// The thread is closed and joined when this handle is dropped.
#[derive(Debug)]
pub struct LogThread {
    /// The thread's sender channel.
    sender: Sender<Message>,
    /// The thread's join handle.
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl Drop for LogThread {
    fn drop(&mut self) {
        // the thread may have exited already
        self.sender.send(Message::Close).ok();

        if let Some(handle) = self.handle.take() {
            if let Ok(Err(error)) = handle.join() {
                eprintln!("the logging thread failed: {error}");
            }
        }
    }
}

/// A message to be sent to the logging thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Outputs a log.
    Queue(Log),
    /// Flushes the logger.
    Flush,
    /// Closes the logging thread.
    Close,
}

/// Buffers logs and writes them to the terminal and a log file.
#[derive(Debug)]
pub struct Logger {
    /// The logger's configuration.
    config: Config,
    /// The log file's path.
    path: PathBuf,
    /// The log file, opened on first write.
    file: Option<BufWriter<File>>,
    /// Logs waiting to be written.
    pending: Vec<Log>,
}

impl Logger {
    /// The time format used in log file names.
    pub const FILE_FORMAT: &'static [FormatItem<'static>] =
        format_description!("[year]-[month]-[day]_[hour][minute][second]");

    /// Creates a new [`Logger`] whose file is named after the current time.
    #[must_use]
    pub fn new(config: Config, dir: impl AsRef<Path>) -> Self {
        let time = self::now();
        let name = time.format(Self::FILE_FORMAT).unwrap_or_else(|_| time.unix_timestamp().to_string());
        let path = dir.as_ref().join(format!("coloriz_{name}.log"));

        Self { config, path, file: None, pending: Vec::with_capacity(config.queue_size) }
    }

    /// Returns the path of the file this [`Logger`] writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether no logs are waiting to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queues a log if its level is enabled, flushing once the queue is full.
    ///
    /// # Errors
    ///
    /// This function will return an error if logs could not be written during a flush.
    pub fn queue(&mut self, log: Log) -> std::io::Result<()> {
        if !self.config.accepts(log.level) {
            return Ok(());
        }

        self.pending.push(log);

        if self.pending.len() >= self.config.queue_size { self.flush() } else { Ok(()) }
    }

    /// Writes every queued log.
    ///
    /// # Errors
    ///
    /// This function will return an error if logs could not be written.
    pub fn flush(&mut self) -> std::io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let logs = std::mem::take(&mut self.pending);

        if self.config.print {
            let mut stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();

            for log in &logs {
                let stream = log.level.stream();
                let line = log.render(self.config.color.then_some(stream));

                match stream {
                    Stream::Stderr => writeln!(stderr, "{line}")?,
                    _ => writeln!(stdout, "{line}")?,
                }
            }
        }

        if self.config.write {
            let file = self.file()?;

            for log in &logs {
                writeln!(file, "{}", log.render(None))?;
            }

            file.flush()?;
        }

        Ok(())
    }

    /// Returns the log file, creating it and its directory on first use.
    fn file(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                if let Some(dir) = self.path.parent() {
                    std::fs::create_dir_all(dir)?;
                }

                BufWriter::new(File::options().append(true).create(true).open(&self.path)?)
            }
        };

        Ok(self.file.insert(file))
    }
}

/// A logger configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Whether logs are printed to the terminal.
    pub print: bool,
    /// Whether logs are written to a file.
    pub write: bool,
    /// Whether printed logs are colored.
    pub color: bool,
    /// The lowest level that is output.
    pub level: Level,
    /// How many logs are queued before they are written.
    pub queue_size: usize,
    /// How long queued logs may wait before they are written.
    pub stale_time: Duration,
}

impl Config {
    /// Returns whether a log of the given level would be output.
    #[must_use]
    pub fn accepts(&self, level: Level) -> bool {
        (self.print || self.write) && level >= self.level
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            print: true,
            write: true,
            color: true,
            level: if cfg!(debug_assertions) { Level::Debug } else { Level::Info },
            queue_size: 8,
            stale_time: Duration::from_secs(1),
        }
    }
}

/// A log severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Something failed, but the bot can continue.
    Warn,
    /// Something failed that needs attention.
    Error,
}

impl Level {
    /// Returns the level's label.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Returns the terminal stream that logs of this level are printed to.
    #[must_use]
    pub const fn stream(self) -> Stream {
        if matches!(self, Self::Error) { Stream::Stderr } else { Stream::Stdout }
    }

    /// Returns the padded label, colored if the given stream supports it.
    #[must_use]
    pub fn label(self, color: Option<Stream>) -> String {
        let text = format!("{:<5}", self.name());
        let Some(stream) = color else {
            return text;
        };

        match self {
            Self::Debug => text.if_supports_color(stream, |s| s.bright_purple()).to_string(),
            Self::Info => text.if_supports_color(stream, |s| s.bright_blue()).to_string(),
            Self::Warn => text.if_supports_color(stream, |s| s.bright_yellow()).to_string(),
            Self::Error => text.if_supports_color(stream, |s| s.bright_red()).to_string(),
        }
    }
}

/// A log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// When the log was created.
    pub time: OffsetDateTime,
    /// The log's level.
    pub level: Level,
    /// The log's text.
    pub text: Box<str>,
}

impl Log {
    /// The time format used at the start of each line.
    pub const TIME_FORMAT: &'static [FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

    /// Creates a new [`Log`].
    pub fn new(time: OffsetDateTime, level: Level, text: impl Display) -> Self {
        Self { time, level, text: text.to_string().into_boxed_str() }
    }

    /// Renders this log as a single line, colored for the given stream if any.
    #[must_use]
    pub fn render(&self, color: Option<Stream>) -> String {
        let time = self.time.format(Self::TIME_FORMAT).unwrap_or_else(|_| self.time.to_string());
        let time = match color {
            Some(stream) => time.if_supports_color(stream, |s| s.dimmed()).to_string(),
            None => time,
        };

        format!("{time} {} {}", self.level.label(color), self.text)
    }
}

/// Outputs a debug log.
///
/// ```ignore
/// debug!("loaded {count} roles")?;
/// ```
#[macro_export]
macro_rules! debug {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::Debug, ::std::format_args!($($args)+))
    };
}

/// Outputs an info log.
///
/// ```ignore
/// info!("connected as @{name}")?;
/// ```
#[macro_export]
macro_rules! info {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::Info, ::std::format_args!($($args)+))
    };
}

/// Outputs a warning log.
///
/// ```ignore
/// warn!("interaction failed: {error}")?;
/// ```
#[macro_export]
macro_rules! warn {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::Warn, ::std::format_args!($($args)+))
    };
}

/// Outputs an error log.
///
/// ```ignore
/// error!("unable to notify the executing user: {error}")?;
/// ```
#[macro_export]
macro_rules! error {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::Error, ::std::format_args!($($args)+))
    };
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const QUIET: Config = Config {
        print: false,
        write: true,
        color: false,
        level: Level::Info,
        queue_size: 4,
        stale_time: Duration::from_millis(10),
    };

    #[test]
    fn filters_by_level_and_output() {
        assert!(QUIET.accepts(Level::Warn));
        assert!(QUIET.accepts(Level::Info));
        assert!(!QUIET.accepts(Level::Debug));
        assert!(!Config { print: false, write: false, ..QUIET }.accepts(Level::Error));
    }

    #[test]
    fn renders_uncolored_lines() {
        let log = Log::new(datetime!(2023-11-05 14:03:09.5 UTC), Level::Warn, "a role was missing");

        assert_eq!(log.render(None), "2023-11-05 14:03:09.500 WARN  a role was missing");
        assert!(matches!(Level::Error.stream(), Stream::Stderr));
        assert!(matches!(Level::Info.stream(), Stream::Stdout));
    }

    #[test]
    fn flush_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = Logger::new(QUIET, dir.path());
        let time = datetime!(2023-11-05 14:03:09 UTC);

        logger.queue(Log::new(time, Level::Info, "first")).unwrap();
        logger.queue(Log::new(time, Level::Debug, "hidden")).unwrap();
        logger.queue(Log::new(time, Level::Error, "second")).unwrap();
        assert!(!logger.is_empty());

        logger.flush().unwrap();
        assert!(logger.is_empty());

        let text = std::fs::read_to_string(logger.path()).unwrap();

        assert!(text.contains("INFO  first"));
        assert!(text.contains("ERROR second"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn queue_flushes_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = Logger::new(Config { queue_size: 2, ..QUIET }, dir.path());
        let time = datetime!(2023-11-05 14:03:09 UTC);

        logger.queue(Log::new(time, Level::Info, "one")).unwrap();
        assert!(!logger.path().exists());

        logger.queue(Log::new(time, Level::Info, "two")).unwrap();
        assert!(logger.is_empty());
        assert!(logger.path().exists());
    }
}
