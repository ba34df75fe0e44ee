use crate::error::{StripError, StripResult};

/// A source-space crop rectangle produced by [`cover_fit`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Compute the centered source crop that fills `target_w` x `target_h`
/// without distortion ("cover" fitting).
///
/// If the source is wider than the target aspect, the crop keeps the full
/// source height and trims left/right equally; otherwise it keeps the full
/// width and trims top/bottom equally.
pub fn cover_fit(
    image_w: u32,
    image_h: u32,
    target_w: f64,
    target_h: f64,
) -> StripResult<CropRect> {
    if image_w == 0 || image_h == 0 {
        return Err(StripError::validation(
            "cover_fit source dimensions must be > 0",
        ));
    }
    if !(target_w > 0.0) || !(target_h > 0.0) {
        return Err(StripError::validation(
            "cover_fit target dimensions must be > 0",
        ));
    }

    let iw = f64::from(image_w);
    let ih = f64::from(image_h);
    let image_aspect = iw / ih;
    let target_aspect = target_w / target_h;

    let crop = if image_aspect > target_aspect {
        // Crop left/right.
        let height = ih;
        let width = height * target_aspect;
        CropRect {
            x: (iw - width) / 2.0,
            y: 0.0,
            width,
            height,
        }
    } else {
        // Crop top/bottom.
        let width = iw;
        let height = width / target_aspect;
        CropRect {
            x: 0.0,
            y: (ih - height) / 2.0,
            width,
            height,
        }
    };

    Ok(crop)
}
