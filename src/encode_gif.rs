use image::codecs::gif::{GifEncoder, Repeat};

use crate::{
    error::{StripError, StripResult},
    surface::{MAX_CANVAS_DIM, Surface},
};

/// Per-frame duration of the exported animation, matching the capture
/// cadence of the photobooth clips.
pub const STRIP_FRAME_DELAY_MS: u32 = 200;

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub frame_delay_ms: u32,
}

impl EncodeConfig {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_delay_ms: STRIP_FRAME_DELAY_MS,
        }
    }

    pub fn validate(&self) -> StripResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StripError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.width > MAX_CANVAS_DIM || self.height > MAX_CANVAS_DIM {
            return Err(StripError::validation(
                "encode width/height exceeds the canvas limit",
            ));
        }
        if self.frame_delay_ms == 0 {
            return Err(StripError::validation("frame_delay_ms must be non-zero"));
        }
        Ok(())
    }
}

/// Collects composited frames and re-encodes them as one infinitely looping
/// GIF.
pub struct GifStripEncoder {
    cfg: EncodeConfig,
    frames: Vec<image::Frame>,
}

impl GifStripEncoder {
    pub fn new(cfg: EncodeConfig) -> StripResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            frames: Vec::new(),
        })
    }

    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    pub fn push_frame(&mut self, surface: &Surface) -> StripResult<()> {
        if surface.width() != self.cfg.width || surface.height() != self.cfg.height {
            return Err(StripError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                surface.width(),
                surface.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        let buffer = surface.to_rgba_image()?;
        let delay = image::Delay::from_numer_denom_ms(self.cfg.frame_delay_ms, 1);
        self.frames.push(image::Frame::from_parts(buffer, 0, 0, delay));
        Ok(())
    }

    /// Encode all collected frames into one looping GIF buffer.
    pub fn finish(self) -> StripResult<Vec<u8>> {
        if self.frames.is_empty() {
            return Err(StripError::encoding(
                "cannot encode an animation with zero frames",
            ));
        }

        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut buf, 10);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| StripError::encoding(format!("gif repeat header: {e}")))?;
            for frame in self.frames {
                encoder
                    .encode_frame(frame)
                    .map_err(|e| StripError::encoding(format!("gif frame encode: {e}")))?;
            }
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(
            EncodeConfig {
                width: 0,
                height: 10,
                frame_delay_ms: 200,
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                width: 10,
                height: 10,
                frame_delay_ms: 0,
            }
            .validate()
            .is_err()
        );
        assert!(EncodeConfig::for_canvas(10, 10).validate().is_ok());
        assert_eq!(EncodeConfig::for_canvas(10, 10).frame_delay_ms, 200);
    }

    #[test]
    fn finish_produces_a_gif_header() {
        let mut enc = GifStripEncoder::new(EncodeConfig::for_canvas(4, 4)).unwrap();
        for _ in 0..2 {
            let surface = Surface::new(4, 4).unwrap();
            enc.push_frame(&surface).unwrap();
        }
        assert_eq!(enc.frame_count(), 2);
        let bytes = enc.finish().unwrap();
        assert!(bytes.starts_with(b"GIF8"));
    }

    #[test]
    fn finish_rejects_zero_frames() {
        let enc = GifStripEncoder::new(EncodeConfig::for_canvas(4, 4)).unwrap();
        assert!(matches!(enc.finish(), Err(StripError::Encoding(_))));
    }

    #[test]
    fn push_frame_rejects_size_mismatch() {
        let mut enc = GifStripEncoder::new(EncodeConfig::for_canvas(4, 4)).unwrap();
        let surface = Surface::new(5, 4).unwrap();
        assert!(enc.push_frame(&surface).is_err());
    }
}
