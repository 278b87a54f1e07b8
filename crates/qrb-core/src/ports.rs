use crate::Result;

/// One machine-readable code found in an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCode {
    /// Decoded text payload.
    pub payload: String,
    /// Symbology label as reported by the decoding library (e.g. "QR-Code").
    pub symbology: String,
}

/// Hexagonal port for the image-decoding subsystem.
///
/// Implementations are CPU-bound and synchronous; callers on an async runtime
/// should run them on the blocking pool. An image with no recognizable codes
/// is `Ok(vec![])`, not an error.
pub trait CodeDecoder: Send + Sync {
    fn decode_image(&self, bytes: &[u8]) -> Result<Vec<DecodedCode>>;
}
