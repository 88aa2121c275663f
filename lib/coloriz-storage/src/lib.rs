//! Provides a typed file storage interface for the coloriz Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::borrow::Cow;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(feature = "compress")] pub use crate::compress::*;
#[cfg(feature = "compress")] mod compress;

#[cfg(feature = "formats")] pub use crate::formats::*;
#[cfg(feature = "formats")] mod formats;

/// The directory that relative storage keys are resolved against.
static ROOT: OnceLock<Box<Path>> = OnceLock::new();

/// The root directory used when [`set_root`] is never called.
pub const DEFAULT_ROOT: &str = "data";

/// Sets the storage root directory, returning `false` if it was already set.
pub fn set_root(path: impl AsRef<Path>) -> bool {
    ROOT.set(Box::from(path.as_ref())).is_ok()
}

/// Returns the storage root directory.
#[must_use]
pub fn root() -> &'static Path {
    ROOT.get().map_or(Path::new(DEFAULT_ROOT), |path| &**path)
}

/// A possible storage error.
#[derive(Debug, thiserror::Error)]
pub enum Error<F: Format> {
    /// The file could not be opened, written, or moved into place.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The value could not be encoded, or the stored data could not be decoded.
    #[error("invalid stored value at '{path}'")]
    Format {
        /// The key's file path.
        path: PathBuf,
        /// The underlying format error.
        #[source]
        source: F::Error,
    },
}

/// Streams values to and from files.
///
/// Formats may wrap one another, such as [`Compress`] wrapping [`MsgPack`], and should be cheap to
/// construct. Most are zero-sized or transparent newtypes.
pub trait Format: Debug {
    /// The error returned when a value cannot be encoded or decoded.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the file extension for this [`Format`].
    fn extension(&self) -> Cow<'static, str>;

    /// Encodes the value into the writer.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be encoded or written.
    fn encode<T: Serialize, W: Write>(&self, writer: W, value: &T) -> Result<(), Self::Error>;

    /// Decodes a value from the reader.
    ///
    /// # Errors
    ///
    /// This function will return an error if the data could not be read or decoded.
    fn decode<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T, Self::Error>;
}

/// Locates a stored value of type `T`, encoded using the format `F`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key<T, F: Format> {
    /// The resolved file path, including the format's extension.
    path: PathBuf,
    /// The value's format.
    format: F,
    /// Type marker.
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Key<T, F>
where
    T: Serialize + DeserializeOwned,
    F: Format,
{
    /// Creates a new [`Key<T, F>`] from a path stem; the format's extension is appended.
    pub fn new(stem: impl AsRef<Path>, format: F) -> Self {
        let path = stem.as_ref().with_extension(&*format.extension());

        Self { path, format, _marker: PhantomData }
    }

    /// Returns the full file path of this key.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether a value is stored at this key.
    ///
    /// # Errors
    ///
    /// This function will return an error if the path could not be verified.
    pub fn exists(&self) -> Result<bool, Error<F>> {
        self.path.try_exists().map_err(Into::into)
    }

    /// Reads and decodes the stored value.
    ///
    /// # Errors
    ///
    /// This function will return an error if the data could not be read or decoded.
    pub fn read(&self) -> Result<T, Error<F>> {
        let reader = BufReader::new(File::open(&self.path)?);

        self.format.decode(reader).map_err(|source| self.invalid(source))
    }

    /// Reads the stored value, returning the default value if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// This function will return an error if existing data could not be read or decoded.
    pub fn read_or_default(&self) -> Result<T, Error<F>>
    where
        T: Default,
    {
        match self.read() {
            Err(Error::Io(error)) if error.kind() == ErrorKind::NotFound => Ok(T::default()),
            result => result,
        }
    }

    /// Encodes and writes the given value, creating any missing parent directories.
    ///
    /// The value is written beside the key first and then moved into place, so an interrupted
    /// write leaves the previous value intact.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be encoded or written.
    pub fn write(&self, value: &T) -> Result<(), Error<F>> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let partial = self.path.with_extension(format!("{}.partial", self.format.extension()));
        let mut writer = BufWriter::new(File::create(&partial)?);

        self.format.encode(&mut writer, value).map_err(|source| self.invalid(source))?;
        writer.into_inner().map_err(std::io::IntoInnerError::into_error)?.sync_all()?;

        std::fs::rename(partial, &self.path).map_err(Into::into)
    }

    /// Wraps a format error with this key's path.
    fn invalid(&self, source: F::Error) -> Error<F> {
        Error::Format { path: self.path.clone(), source }
    }

    /// Reads the stored value (or its default), applies the given closure, then writes it back.
    ///
    /// The closure's return value is passed through.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be read or written.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, Error<F>>
    where
        T: Default,
    {
        let mut value = self.read_or_default()?;
        let output = f(&mut value);

        self.write(&value)?;

        Ok(output)
    }

    /// Removes the stored value.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file could not be removed.
    pub fn remove(&self) -> Result<(), Error<F>> {
        std::fs::remove_file(&self.path).map_err(Into::into)
    }
}

impl<T, F, S> From<S> for Key<T, F>
where
    T: Serialize + DeserializeOwned,
    F: Format + Default,
    S: AsRef<Path>,
{
    /// Resolves the given relative path against the storage [`root`].
    fn from(value: S) -> Self {
        Self::new(self::root().join(value), F::default())
    }
}

/// Provides a storage key builder for the implementing type.
///
/// This is usually derived through `#[derive(Storage)]`.
pub trait Stored: Serialize + DeserializeOwned {
    /// The arguments provided when creating a new [`Key<T, F>`].
    type Arguments;
    /// The expected [`Format`] of this type.
    type Format: Format;

    /// Creates a new [`Key<T, F>`] with the provided arguments.
    fn stored(arguments: Self::Arguments) -> Key<Self, Self::Format>;
}

#[cfg(all(test, feature = "full"))]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
        label: String,
    }

    #[test]
    fn extension_is_appended() {
        let key = Key::<Counter, _>::new("a/b", Compress::<MsgPack, 3>::default());

        assert_eq!(key.path(), Path::new("a/b.packx"));
        assert_eq!(Key::<Counter, _>::new("a/b", Json).path(), Path::new("a/b.json"));
    }

    #[test]
    fn missing_values_read_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let key = Key::<Counter, _>::new(dir.path().join("missing"), MsgPack);

        assert!(!key.exists().unwrap());
        assert!(key.read().is_err());
        assert_eq!(key.read_or_default().unwrap(), Counter::default());
    }

    #[test]
    fn compressed_values_survive_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let key = Key::<Counter, _>::new(dir.path().join("nested/value"), Compress::<MsgPack, 9>::default());
        let value = Counter { count: 3, label: "#FF0000".to_string() };

        key.write(&value).unwrap();

        assert!(key.exists().unwrap());
        assert!(!key.path().with_extension("packx.partial").exists());
        assert_eq!(key.read().unwrap(), value);

        key.remove().unwrap();

        assert!(!key.exists().unwrap());
    }

    #[test]
    fn modify_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let key = Key::<Counter, _>::new(dir.path().join("counter"), Json);

        assert_eq!(key.modify(|c| { c.count += 1; c.count }).unwrap(), 1);
        assert_eq!(key.modify(|c| { c.count += 1; c.count }).unwrap(), 2);
        assert_eq!(key.read().unwrap().count, 2);
    }

    #[test]
    fn corrupt_values_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let key = Key::<Counter, _>::new(dir.path().join("corrupt"), Json);

        std::fs::write(key.path(), b"{ not json").unwrap();

        assert!(matches!(key.read_or_default(), Err(Error::Format { .. })));
    }
}
