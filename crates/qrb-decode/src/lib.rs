//! Image decoding adapter (`image` + `rqrr`).
//!
//! This crate implements the `qrb-core` CodeDecoder port. Decoding happens
//! entirely in memory: raw bytes in, decoded payloads out.

use qrb_core::{
    ports::{CodeDecoder, DecodedCode},
    Error, Result,
};

/// Symbology label reported for every code this adapter can read.
const QR_SYMBOLOGY: &str = "QR-Code";

#[derive(Clone, Copy, Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl CodeDecoder for RqrrDecoder {
    fn decode_image(&self, bytes: &[u8]) -> Result<Vec<DecodedCode>> {
        let luma = image::load_from_memory(bytes)
            .map_err(|e| Error::External(format!("image error: {e}")))?
            .to_luma8();

        let (w, h) = (luma.width() as usize, luma.height() as usize);
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
            luma.get_pixel(x as u32, y as u32).0[0]
        });
        let mut codes = Vec::new();
        for grid in prepared.detect_grids() {
            // A grid that fails to decode is skipped; other codes in the
            // same image may still be readable.
            match grid.decode() {
                Ok((_meta, content)) => codes.push(DecodedCode {
                    payload: content,
                    symbology: QR_SYMBOLOGY.to_string(),
                }),
                Err(e) => tracing::warn!("skipping undecodable grid: {e}"),
            }
        }

        Ok(codes)
    }
}
