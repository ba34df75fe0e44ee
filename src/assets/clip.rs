use std::io::Cursor;
use std::time::Duration;

use image::AnimationDecoder;

use crate::{
    assets::PreparedImage,
    composite::premultiply_rgba8_in_place,
    error::{StripError, StripResult},
};

/// Hard ceiling on decoded frames per clip. Clips are a few seconds of
/// capture; anything past this is rejected rather than decoded unboundedly.
pub const MAX_CLIP_FRAMES: usize = 240;

/// A slot's looping clip decoded into an ordered frame sequence. The GIF
/// decoder composites disposal and frame placement for us, so every entry
/// spans the clip's full logical screen.
#[derive(Clone, Debug)]
pub struct DecodedClip {
    pub frames: Vec<PreparedImage>,
}

impl DecodedClip {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Decode one encoded looping clip (GIF) into its frame sequence.
///
/// A clip with zero frames is a load failure, not an empty animation.
pub fn decode_clip(bytes: &[u8], max_frames: usize) -> StripResult<DecodedClip> {
    let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| StripError::image_load(format!("decode clip: {e}")))?;

    let raw_frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| StripError::image_load(format!("decode clip frames: {e}")))?;

    if raw_frames.is_empty() {
        return Err(StripError::image_load("clip decoded to zero frames"));
    }
    if raw_frames.len() > max_frames {
        return Err(StripError::validation(format!(
            "clip has {} frames, maximum is {max_frames}",
            raw_frames.len()
        )));
    }

    let mut frames = Vec::with_capacity(raw_frames.len());
    for frame in raw_frames {
        let buffer = frame.into_buffer();
        let (width, height) = buffer.dimensions();
        let mut rgba = buffer.into_raw();
        premultiply_rgba8_in_place(&mut rgba);
        frames.push(PreparedImage::from_premul(width, height, rgba)?);
    }

    Ok(DecodedClip { frames })
}

/// Decode every slot's clip payload, one worker per slot, against a single
/// deadline. Results come back in slot order.
pub fn decode_clips(
    payloads: &[Vec<u8>],
    timeout: Duration,
    max_frames: usize,
) -> StripResult<Vec<DecodedClip>> {
    tracing::debug!(slots = payloads.len(), "decoding clip payloads");
    crate::assets::fan_out_decode(payloads.to_vec(), timeout, move |idx, bytes| {
        decode_clip(bytes, max_frames)
            .map_err(|e| match e {
                StripError::Validation(msg) => StripError::Validation(format!("slot {idx}: {msg}")),
                other => StripError::image_load(format!("slot {idx}: {other}")),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_gif(frame_colors: &[[u8; 4]], w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut enc = image::codecs::gif::GifEncoder::new(&mut buf);
            for color in frame_colors {
                let img = image::RgbaImage::from_pixel(w, h, image::Rgba(*color));
                let frame = image::Frame::from_parts(
                    img,
                    0,
                    0,
                    image::Delay::from_numer_denom_ms(100, 1),
                );
                enc.encode_frame(frame).unwrap();
            }
        }
        buf
    }

    #[test]
    fn decode_clip_yields_all_frames_in_order() {
        let bytes = solid_gif(
            &[[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]],
            4,
            4,
        );
        let clip = decode_clip(&bytes, MAX_CLIP_FRAMES).unwrap();
        assert_eq!(clip.frame_count(), 3);
        // Every frame spans the clip's full logical screen.
        assert!(clip.frames.iter().all(|f| (f.width, f.height) == (4, 4)));
        // GIF quantizes, but the dominant channel survives.
        assert!(clip.frames[0].pixel(0, 0)[0] > 200);
        assert!(clip.frames[1].pixel(0, 0)[1] > 200);
        assert!(clip.frames[2].pixel(0, 0)[2] > 200);
    }

    #[test]
    fn decode_clip_rejects_garbage_and_frame_overflow() {
        assert!(matches!(
            decode_clip(b"not a gif", MAX_CLIP_FRAMES),
            Err(StripError::ImageLoad(_))
        ));

        let bytes = solid_gif(&[[1, 2, 3, 255]; 3], 2, 2);
        assert!(matches!(
            decode_clip(&bytes, 2),
            Err(StripError::Validation(_))
        ));
    }

    #[test]
    fn decode_clips_keeps_slot_order_and_counts() {
        let a = solid_gif(&[[255, 0, 0, 255]; 2], 2, 2);
        let b = solid_gif(&[[0, 255, 0, 255]; 5], 2, 2);
        let out = decode_clips(&[a, b], Duration::from_secs(10), MAX_CLIP_FRAMES).unwrap();
        assert_eq!(out[0].frame_count(), 2);
        assert_eq!(out[1].frame_count(), 5);
    }
}
