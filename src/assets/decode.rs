use std::time::Duration;

use crate::{
    assets::PreparedImage,
    composite::premultiply_rgba8_in_place,
    error::{StripError, StripResult},
};

/// Decode one encoded still into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> StripResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StripError::image_load(format!("decode still image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    PreparedImage::from_premul(width, height, rgba8_premul)
}

/// Decode every slot's still payload, one worker per slot, against a single
/// deadline. Results come back in slot order.
pub fn decode_stills(payloads: &[Vec<u8>], timeout: Duration) -> StripResult<Vec<PreparedImage>> {
    tracing::debug!(slots = payloads.len(), "decoding still payloads");
    crate::assets::fan_out_decode(payloads.to_vec(), timeout, |idx, bytes| {
        decode_image(bytes).map_err(|e| StripError::image_load(format!("slot {idx}: {e}")))
    })
}
