use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::error::{StripError, StripResult};

pub mod clip;
pub mod decode;

/// Bounds applied to every decode stage.
#[derive(Clone, Debug)]
pub struct DecodeOpts {
    /// Deadline for all of an export's decode jobs together. A stalled decode
    /// fails the export instead of hanging it.
    pub timeout: Duration,
    /// Maximum decoded frames accepted per looping clip.
    pub max_clip_frames: usize,
}

impl Default for DecodeOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_clip_frames: clip::MAX_CLIP_FRAMES,
        }
    }
}

/// A decoded image ready for compositing.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> StripResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| StripError::validation("image size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(StripError::validation(
                "prepared image buffer must be width*height*4 bytes",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Pixel at (x, y); out-of-bounds reads return transparent.
    pub fn pixel(&self, x: i64, y: i64) -> [u8; 4] {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = &self.rgba8_premul[idx..idx + 4];
        [px[0], px[1], px[2], px[3]]
    }
}

/// Run one decode job per input on its own thread and join the results
/// against a single deadline.
///
/// Decoding has no shared mutable state, so slots may decode concurrently;
/// only drawing is serialized. Workers that outlive the deadline own their
/// input and are simply abandoned.
pub(crate) fn fan_out_decode<T, F>(
    inputs: Vec<Vec<u8>>,
    timeout: Duration,
    job: F,
) -> StripResult<Vec<T>>
where
    T: Send + 'static,
    F: Fn(usize, &[u8]) -> StripResult<T> + Send + Sync + Clone + 'static,
{
    let n = inputs.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let (tx, rx) = mpsc::channel::<(usize, StripResult<T>)>();
    for (idx, bytes) in inputs.into_iter().enumerate() {
        let tx = tx.clone();
        let job = job.clone();
        std::thread::spawn(move || {
            let result = job(idx, &bytes);
            // The receiver may already have given up on the deadline.
            let _ = tx.send((idx, result));
        });
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let mut slots: Vec<Option<T>> = (0..n).map(|_| None).collect();
    let mut received = 0usize;
    while received < n {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(StripError::decode_timeout(format!(
                "{received}/{n} decode jobs finished within {timeout:?}"
            )));
        }
        match rx.recv_timeout(remaining) {
            Ok((idx, Ok(value))) => {
                slots[idx] = Some(value);
                received += 1;
            }
            Ok((_, Err(e))) => return Err(e),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(StripError::decode_timeout(format!(
                    "{received}/{n} decode jobs finished within {timeout:?}"
                )));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(StripError::image_load(
                    "decode worker exited without a result",
                ));
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| StripError::image_load("decode stage lost a slot result"))
        })
        .collect()
}
