//! Binary payloads with an optional reversible image transform.
//!
//! When the registry is configured with an image key, payloads recognized as
//! images are stored as `TRANSFORM_MARKER || nonce || ciphertext || tag`.
//! Decoding strips the transform again, so callers always read back exactly
//! the bytes they stored.

use std::sync::Arc;

use entidoc_codec::{CodecError, DocumentReader, DocumentWriter, Value};
use tracing::{trace, warn};

use super::{Codec, CodecProvider, DecoderContext, EncoderContext};
use crate::crypto::{CryptoManager, EncryptionKey};
use crate::entity::{FieldValue, ValueType};
use crate::error::{CoreError, CoreResult};

/// Prefix identifying a transformed payload.
pub const TRANSFORM_MARKER: [u8; 4] = [0xED, 0x1C, 0x0D, 0x01];

/// Image formats the transform applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG.
    Png,
    /// JPEG.
    Jpeg,
    /// GIF87a / GIF89a.
    Gif,
    /// Windows bitmap.
    Bmp,
    /// WebP in a RIFF container.
    WebP,
}

/// Recognizes an image by its leading magic bytes.
pub fn image_format(bytes: &[u8]) -> Option<ImageFormat> {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(JPEG) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 14 && bytes.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else {
        None
    }
}

/// Codec for `Bytes` values.
pub struct ImageCodec {
    crypto: Option<CryptoManager>,
}

impl ImageCodec {
    /// Creates the codec; `None` disables the transform.
    pub fn new(key: Option<&EncryptionKey>) -> Self {
        Self {
            crypto: key.map(CryptoManager::new),
        }
    }

    /// Whether recognized images are transformed on encode.
    pub fn is_transform_enabled(&self) -> bool {
        self.crypto.is_some()
    }

    /// The stored form of `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn transform(&self, payload: &[u8]) -> CoreResult<Vec<u8>> {
        let (Some(crypto), Some(format)) = (&self.crypto, image_format(payload)) else {
            return Ok(payload.to_vec());
        };
        let sealed = crypto.encrypt(payload)?;
        let mut out = Vec::with_capacity(TRANSFORM_MARKER.len() + sealed.len());
        out.extend_from_slice(&TRANSFORM_MARKER);
        out.extend(sealed);
        trace!(?format, size = payload.len(), "Image payload transformed");
        Ok(out)
    }

    /// The original payload behind a stored form.
    ///
    /// Unmarked input is returned as-is, and so is marked input that cannot
    /// be reversed.
    pub fn restore(&self, stored: Vec<u8>) -> Vec<u8> {
        let Some(sealed) = stored.strip_prefix(&TRANSFORM_MARKER) else {
            return stored;
        };
        match &self.crypto {
            Some(crypto) => match crypto.decrypt(sealed) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, size = stored.len(), "Marked binary payload not reversible, returned as stored");
                    stored
                }
            },
            None => {
                warn!(size = stored.len(), "Marked binary payload read without an image key");
                stored
            }
        }
    }
}

impl std::fmt::Debug for ImageCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCodec")
            .field("transform", &self.is_transform_enabled())
            .finish()
    }
}

impl Codec for ImageCodec {
    fn encoder_type(&self) -> ValueType {
        ValueType::Bytes
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, _: &EncoderContext<'_>) -> CoreResult<()> {
        let FieldValue::Bytes(payload) = value else {
            return Err(CoreError::illegal_argument(format!(
                "codec for bytes cannot encode a {}",
                value.value_type()
            )));
        };
        writer.write_binary(&self.transform(payload)?)?;
        Ok(())
    }

    fn decode(&self, reader: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        match reader.read_value()? {
            Value::Null => Ok(None),
            Value::Bytes(stored) => Ok(Some(FieldValue::Bytes(self.restore(stored)))),
            other => Err(CodecError::UnexpectedType {
                expected: "bytes",
                actual: other.type_name(),
            }
            .into()),
        }
    }
}

/// Provides the [`ImageCodec`] for `Bytes`.
#[derive(Debug)]
pub struct ImageCodecProvider {
    codec: Arc<ImageCodec>,
}

impl ImageCodecProvider {
    /// Creates the provider; `None` disables the transform.
    pub fn new(key: Option<&EncryptionKey>) -> Self {
        Self {
            codec: Arc::new(ImageCodec::new(key)),
        }
    }
}

impl CodecProvider for ImageCodecProvider {
    fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>> {
        match value_type {
            ValueType::Bytes => Some(self.codec.clone()),
            _ => None,
        }
    }
}
