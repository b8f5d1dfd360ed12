//! Payload masking.

/// XORs `data` in place with `key`, repeating the key every 4 bytes.
///
/// Applying the same key twice restores the original bytes.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    let mut chunks = data.chunks_exact_mut(4);

    for chunk in &mut chunks {
        chunk[0] ^= key[0];
        chunk[1] ^= key[1];
        chunk[2] ^= key[2];
        chunk[3] ^= key[3];
    }

    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= key[i];
    }
}
