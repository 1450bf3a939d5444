use bincode::{DefaultOptions, Options};
use serde::Deserialize;
use tokio_util::codec::LengthDelimitedCodec;

/// Every message travels in one little-endian length-prefixed frame.
pub(crate) fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .little_endian()
        .max_frame_length(crate::MAX_FRAME_SIZE)
        .new_codec()
}

#[inline]
pub(crate) fn serialize<T>(value: &T) -> crate::Result<Vec<u8>>
where
    T: serde::Serialize + ?Sized,
{
    DefaultOptions::new()
        .with_limit(crate::MAX_FRAME_SIZE as u64)
        .with_fixint_encoding()
        .serialize(value)
        .map_err(|e| crate::Error::SerializationError(format!("Serialization failed: {e:?}")))
}

#[inline]
pub(crate) fn deserialize<'a, T>(bytes: &'a [u8]) -> crate::Result<T>
where
    T: Deserialize<'a>,
{
    DefaultOptions::new()
        .with_limit(crate::MAX_FRAME_SIZE as u64)
        .with_fixint_encoding()
        .deserialize(bytes)
        .map_err(|e| {
            crate::Error::SerializationError(format!(
                "Deserialization failed: {e:?}, {} byte(s)",
                bytes.len()
            ))
        })
}
