use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Format;

/// An error from a compressed [`Format`].
#[derive(Debug, thiserror::Error)]
pub enum CompressError<E: std::error::Error + 'static> {
    /// The compressed stream could not be finished.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The wrapped format failed.
    #[error(transparent)]
    Inner(E),
}

/// Gzip-compresses the stream of the wrapped [`Format`].
///
/// `C` is the compression level, from `0` (stored) to `9` (smallest). Levels above `9` are
/// treated as `9`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Compress<F: Format, const C: u8 = 5>(F);

impl<F: Format, const C: u8> Compress<F, C> {
    /// Wraps the given format.
    pub const fn new(format: F) -> Self {
        Self(format)
    }

    /// Returns the gzip compression level.
    pub fn level(&self) -> Compression {
        Compression::new(u32::from(C.min(9)))
    }
}

impl<F: Format, const C: u8> Format for Compress<F, C> {
    type Error = CompressError<F::Error>;

    fn extension(&self) -> Cow<'static, str> {
        format!("{}x", self.0.extension()).into()
    }

    fn encode<T: Serialize, W: Write>(&self, writer: W, value: &T) -> Result<(), Self::Error> {
        let mut encoder = GzEncoder::new(writer, self.level());

        self.0.encode(&mut encoder, value).map_err(CompressError::Inner)?;
        encoder.finish()?;

        Ok(())
    }

    fn decode<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T, Self::Error> {
        self.0.decode(GzDecoder::new(reader)).map_err(CompressError::Inner)
    }
}

#[cfg(all(test, feature = "formats"))]
mod tests {
    use super::*;
    use crate::MsgPack;

    #[test]
    fn clamps_the_level() {
        assert_eq!(Compress::<MsgPack, 12>::default().level(), Compression::best());
        assert_eq!(Compress::<MsgPack>::default().level(), Compression::new(5));
    }

    #[test]
    fn shrinks_repetitive_values() {
        let value = vec!["#FF0000"; 256];
        let mut plain = vec![];
        let mut packed = vec![];

        MsgPack.encode(&mut plain, &value).unwrap();
        Compress::<MsgPack, 9>::default().encode(&mut packed, &value).unwrap();

        assert!(packed.len() < plain.len() / 4);
        assert_eq!(Compress::<MsgPack, 9>::default().decode::<Vec<String>, _>(&packed[..]).unwrap(), value);
    }
}
