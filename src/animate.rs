use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    assets::{DecodeOpts, clip::decode_clips},
    encode_gif::{EncodeConfig, GifStripEncoder},
    error::{StripError, StripResult},
    mapping::MappingRegistry,
    model::{CapturedImage, CompositionResult, MAX_SLOTS, OverlayState, PhotoFilter},
    surface::{Surface, render_slot},
};

/// Cooperative cancellation for the animated pipeline, checked between
/// output frames. Cloning shares the token.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress of an animated export, reported once per composited frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportProgress {
    pub frames_done: u32,
    pub frames_total: u32,
}

/// Composite every slot's looping clip into one looping GIF strip.
///
/// The animation advances all slots in lock-step, so its length is the
/// shortest slot's frame count. Each output frame gets a fresh canvas: slot
/// frames drawn through the clipped slot renderer (no per-photo filter on
/// this path), then the overlay across the full canvas.
///
/// Unlike the still path there is no fallback: a missing mapping or a slot
/// without a clip fails outright, and an overlay that has not finished
/// loading is reported as [`StripError::OverlayNotReady`] before any
/// decoding or drawing starts.
#[tracing::instrument(skip_all, fields(design_key = %design_key, slots = captured.len()))]
pub fn compose_animated(
    captured: &[CapturedImage],
    design_key: &str,
    overlay: &OverlayState,
    registry: &MappingRegistry,
    opts: &DecodeOpts,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(ExportProgress),
) -> StripResult<CompositionResult> {
    let overlay = match overlay {
        OverlayState::Ready(img) => img,
        OverlayState::Loading => return Err(StripError::OverlayNotReady),
    };

    if captured.is_empty() {
        return Err(StripError::validation("no captured images to compose"));
    }
    if captured.len() > MAX_SLOTS {
        return Err(StripError::validation(format!(
            "{} captured images exceeds the {MAX_SLOTS} slot limit",
            captured.len()
        )));
    }

    let mapping = registry.lookup(design_key).ok_or_else(|| {
        StripError::no_animatable_input(format!("no frame mapping for design '{design_key}'"))
    })?;
    if mapping.slot_count() != captured.len() {
        return Err(StripError::no_animatable_input(format!(
            "design '{design_key}' expects {} images, got {}",
            mapping.slot_count(),
            captured.len()
        )));
    }

    let mut clip_payloads = Vec::with_capacity(captured.len());
    for (i, cap) in captured.iter().enumerate() {
        match &cap.clip {
            Some(bytes) => clip_payloads.push(bytes.clone()),
            None => {
                return Err(StripError::no_animatable_input(format!(
                    "slot {i} has no looping clip"
                )));
            }
        }
    }

    let clips = decode_clips(&clip_payloads, opts.timeout, opts.max_clip_frames)?;

    // Lock-step advance: the output is only as long as the shortest clip.
    let frame_count = clips
        .iter()
        .map(|c| c.frame_count())
        .min()
        .unwrap_or(0) as u32;
    if frame_count == 0 {
        return Err(StripError::image_load("a clip decoded to zero frames"));
    }

    let mut encoder =
        GifStripEncoder::new(EncodeConfig::for_canvas(mapping.frame_width, mapping.frame_height))?;

    for f in 0..frame_count {
        if cancel.is_canceled() {
            return Err(StripError::Canceled);
        }

        let mut surface = Surface::new(mapping.frame_width, mapping.frame_height)?;
        for (i, clip) in clips.iter().enumerate() {
            render_slot(
                &mut surface,
                &clip.frames[f as usize],
                &mapping.windows[i],
                PhotoFilter::None,
            )?;
        }
        surface.draw_overlay(overlay)?;
        encoder.push_frame(&surface)?;

        progress(ExportProgress {
            frames_done: f + 1,
            frames_total: frame_count,
        });
    }

    let gif = encoder.finish()?;
    tracing::debug!(frame_count, "animated strip encoded");

    Ok(CompositionResult::Animated {
        gif,
        width: mapping.frame_width,
        height: mapping.frame_height,
        frame_count,
    })
}

#[cfg(test)]
mod tests {
    use image::AnimationDecoder;

    use super::*;
    use crate::assets::PreparedImage;

    fn solid_gif(n_frames: usize, px: [u8; 4], w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut enc = image::codecs::gif::GifEncoder::new(&mut buf);
            for _ in 0..n_frames {
                let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
                enc.encode_frame(image::Frame::from_parts(
                    img,
                    0,
                    0,
                    image::Delay::from_numer_denom_ms(100, 1),
                ))
                .unwrap();
            }
        }
        buf
    }

    fn captured_with_clips(frame_counts: &[usize]) -> Vec<CapturedImage> {
        frame_counts
            .iter()
            .map(|&n| {
                CapturedImage::with_clip(Vec::new(), solid_gif(n, [200, 200, 200, 255], 16, 16))
            })
            .collect()
    }

    fn three_slot_registry() -> MappingRegistry {
        MappingRegistry::from_json(
            br#"{
                "triple": {
                    "frame_width": 120,
                    "frame_height": 320,
                    "windows": [
                        { "left": 10, "top": 10, "width": 100, "height": 90, "border_radius": 8 },
                        { "left": 10, "top": 110, "width": 100, "height": 90, "border_radius": 8 },
                        { "left": 10, "top": 210, "width": 100, "height": 90, "border_radius": 8 }
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn ready_overlay(px: [u8; 4], w: u32, h: u32) -> OverlayState {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..w * h {
            data.extend_from_slice(&px);
        }
        OverlayState::Ready(PreparedImage::from_premul(w, h, data).unwrap())
    }

    #[test]
    fn frame_count_is_the_minimum_across_slots() {
        let captured = captured_with_clips(&[5, 8, 6]);
        let result = compose_animated(
            &captured,
            "triple",
            &ready_overlay([0, 0, 0, 0], 120, 320),
            &three_slot_registry(),
            &DecodeOpts::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap();

        let CompositionResult::Animated {
            gif, frame_count, ..
        } = result
        else {
            panic!("expected animated");
        };
        assert_eq!(frame_count, 5);

        let decoder =
            image::codecs::gif::GifDecoder::new(std::io::Cursor::new(gif.as_slice())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 5);
    }

    #[test]
    fn overlay_loading_short_circuits_before_any_work() {
        let captured = captured_with_clips(&[2, 2, 2]);
        let mut progress_calls = 0u32;
        let err = compose_animated(
            &captured,
            "triple",
            &OverlayState::Loading,
            &three_slot_registry(),
            &DecodeOpts::default(),
            &CancelToken::new(),
            &mut |_| progress_calls += 1,
        )
        .unwrap_err();
        assert!(matches!(err, StripError::OverlayNotReady));
        assert!(err.is_recoverable());
        assert_eq!(progress_calls, 0);
    }

    #[test]
    fn missing_mapping_or_clip_is_not_animatable() {
        let captured = captured_with_clips(&[2, 2, 2]);
        let err = compose_animated(
            &captured,
            "unknown-design",
            &ready_overlay([0, 0, 0, 0], 8, 8),
            &three_slot_registry(),
            &DecodeOpts::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, StripError::NoAnimatableInput(_)));

        let mut captured = captured_with_clips(&[2, 2, 2]);
        captured[1].clip = None;
        let err = compose_animated(
            &captured,
            "triple",
            &ready_overlay([0, 0, 0, 0], 8, 8),
            &three_slot_registry(),
            &DecodeOpts::default(),
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap_err();
        match err {
            StripError::NoAnimatableInput(msg) => assert!(msg.contains("slot 1")),
            other => panic!("expected NoAnimatableInput, got {other:?}"),
        }
    }

    #[test]
    fn pre_canceled_token_stops_before_the_first_frame() {
        let captured = captured_with_clips(&[3, 3, 3]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut progress_calls = 0u32;
        let err = compose_animated(
            &captured,
            "triple",
            &ready_overlay([0, 0, 0, 0], 120, 320),
            &three_slot_registry(),
            &DecodeOpts::default(),
            &cancel,
            &mut |_| progress_calls += 1,
        )
        .unwrap_err();
        assert!(matches!(err, StripError::Canceled));
        assert_eq!(progress_calls, 0);
    }

    #[test]
    fn progress_reports_every_frame_and_overlay_tops_each_one() {
        let captured = captured_with_clips(&[3, 3, 3]);
        let mut seen = Vec::new();
        let result = compose_animated(
            &captured,
            "triple",
            &ready_overlay([255, 0, 255, 255], 120, 320),
            &three_slot_registry(),
            &DecodeOpts::default(),
            &CancelToken::new(),
            &mut |p| seen.push(p),
        )
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ExportProgress {
                    frames_done: 1,
                    frames_total: 3
                },
                ExportProgress {
                    frames_done: 2,
                    frames_total: 3
                },
                ExportProgress {
                    frames_done: 3,
                    frames_total: 3
                },
            ]
        );

        let CompositionResult::Animated { gif, .. } = result else {
            panic!("expected animated");
        };
        let decoder =
            image::codecs::gif::GifDecoder::new(std::io::Cursor::new(gif.as_slice())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        for frame in &frames {
            // Opaque overlay wins everywhere, photo windows included.
            let px = frame.buffer().get_pixel(60, 160).0;
            assert!(px[0] > 200 && px[1] < 60 && px[2] > 200);
        }
    }
}
