use std::borrow::Cow;
use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Format;

/// An error from the [`MsgPack`] format.
#[derive(Debug, thiserror::Error)]
pub enum MsgPackError {
    /// The value could not be encoded.
    #[error(transparent)]
    Encode(#[from] rmp_serde::encode::Error),
    /// The data could not be decoded.
    #[error(transparent)]
    Decode(#[from] rmp_serde::decode::Error),
}

/// [MessagePack](https://msgpack.org), keeping struct field names so records stay readable when
/// fields are added.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct MsgPack;

impl Format for MsgPack {
    type Error = MsgPackError;

    fn extension(&self) -> Cow<'static, str> {
        Cow::Borrowed("pack")
    }

    fn encode<T: Serialize, W: Write>(&self, mut writer: W, value: &T) -> Result<(), Self::Error> {
        Ok(rmp_serde::encode::write_named(&mut writer, value)?)
    }

    fn decode<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T, Self::Error> {
        Ok(rmp_serde::from_read(reader)?)
    }
}

/// Pretty-printed [JSON](https://www.json.org).
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Json;

impl Format for Json {
    type Error = serde_json::Error;

    fn extension(&self) -> Cow<'static, str> {
        Cow::Borrowed("json")
    }

    fn encode<T: Serialize, W: Write>(&self, writer: W, value: &T) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(writer, value)
    }

    fn decode<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T, Self::Error> {
        serde_json::from_reader(reader)
    }
}
