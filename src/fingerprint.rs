use img_hash::{HashAlg, HasherConfig};
use std::path::Path;
use tracing::debug;

/// Perceptual fingerprint (pHash) of image evidence.
///
/// SHA-256 answers "is this the exact file?"; a re-encoded or cropped
/// screenshot of the same post changes every SHA-256 bit but keeps a close
/// pHash. The value is informational metadata only and is never part of the
/// content-addressing contract.
fn hasher() -> img_hash::Hasher {
    HasherConfig::new()
        .hash_alg(HashAlg::Gradient) // more robust to brightness shifts than Mean
        .hash_size(8, 8) // 64-bit fingerprint
        .to_hasher()
}

/// Decodes image bytes and returns the base64 pHash, or `None` when the
/// bytes are not a decodable image.
pub fn perceptual_hash_bytes(bytes: &[u8]) -> Option<String> {
    match img_hash::image::load_from_memory(bytes) {
        Ok(img) => Some(hasher().hash_image(&img).to_base64()),
        Err(e) => {
            debug!(error = %e, "skipping perceptual hash: not a decodable image");
            None
        }
    }
}

pub fn perceptual_hash_file(path: &Path) -> Option<String> {
    match img_hash::image::open(path) {
        Ok(img) => Some(hasher().hash_image(&img).to_base64()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping perceptual hash");
            None
        }
    }
}
