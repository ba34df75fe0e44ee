use kurbo::Shape;

use crate::{
    assets::PreparedImage,
    composite::{self, PremulRgba8},
    error::{StripError, StripResult},
    geom::{CropRect, cover_fit},
    mapping::Window,
    model::PhotoFilter,
};

/// Largest canvas edge the engine will allocate.
pub const MAX_CANVAS_DIM: u32 = 8192;

#[derive(Clone, Debug)]
struct ClipRegion {
    rect: kurbo::Rect,
    radius: f64,
}

impl ClipRegion {
    fn contains(&self, x: f64, y: f64) -> bool {
        let p = kurbo::Point::new(x, y);
        if self.radius > 0.0 {
            kurbo::RoundedRect::from_rect(self.rect, self.radius).contains(p)
        } else {
            self.rect.contains(p)
        }
    }
}

#[derive(Clone, Debug, Default)]
struct DrawState {
    /// Active clips, innermost last. A pixel is drawn only if every region
    /// contains it.
    clips: Vec<ClipRegion>,
    filter: PhotoFilter,
}

/// A premultiplied-RGBA8 canvas with a save/restore stack of clip and filter
/// state. All drawing consults the top of the stack, so scoping a slot's
/// clip+filter is a matter of pushing a [`DrawScope`] and letting it drop.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
    stack: Vec<DrawState>,
}

impl Surface {
    /// Allocate a transparent canvas.
    pub fn new(width: u32, height: u32) -> StripResult<Self> {
        if width == 0 || height == 0 {
            return Err(StripError::validation("surface width/height must be > 0"));
        }
        if width > MAX_CANVAS_DIM || height > MAX_CANVAS_DIM {
            return Err(StripError::validation(format!(
                "surface {width}x{height} exceeds the {MAX_CANVAS_DIM} px canvas limit"
            )));
        }
        Ok(Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
            stack: vec![DrawState::default()],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Save the current draw state; the returned scope restores it when
    /// dropped, on every exit path.
    pub fn scope(&mut self) -> DrawScope<'_> {
        let top = self.current_state();
        self.stack.push(top);
        DrawScope { surface: self }
    }

    fn current_state(&self) -> DrawState {
        self.stack.last().cloned().unwrap_or_default()
    }

    /// Pixel at (x, y); out-of-bounds reads return transparent.
    pub fn pixel(&self, x: u32, y: u32) -> PremulRgba8 {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Draw `crop` of `image` scaled to exactly fill `dest`, honoring the
    /// current clip and filter. The mapping is a plain stretch; pass a
    /// cover-fit crop for aspect-correct output.
    pub fn draw_image_crop(
        &mut self,
        image: &PreparedImage,
        crop: CropRect,
        dest: kurbo::Rect,
    ) -> StripResult<()> {
        if !(dest.width() > 0.0) || !(dest.height() > 0.0) {
            return Err(StripError::validation("draw destination must be non-empty"));
        }
        if !(crop.width > 0.0) || !(crop.height > 0.0) {
            return Err(StripError::validation("draw crop must be non-empty"));
        }

        let state = self.current_state();

        // Destination pixels, clamped to the canvas and the clip's bounds.
        let mut x0 = dest.x0.floor().max(0.0) as i64;
        let mut y0 = dest.y0.floor().max(0.0) as i64;
        let mut x1 = (dest.x1.ceil() as i64).min(i64::from(self.width));
        let mut y1 = (dest.y1.ceil() as i64).min(i64::from(self.height));
        for clip in &state.clips {
            x0 = x0.max(clip.rect.x0.floor() as i64);
            y0 = y0.max(clip.rect.y0.floor() as i64);
            x1 = x1.min(clip.rect.x1.ceil() as i64);
            y1 = y1.min(clip.rect.y1.ceil() as i64);
        }

        for y in y0..y1 {
            for x in x0..x1 {
                let cx = x as f64 + 0.5;
                let cy = y as f64 + 0.5;
                if !dest.contains(kurbo::Point::new(cx, cy)) {
                    continue;
                }
                if !state.clips.iter().all(|clip| clip.contains(cx, cy)) {
                    continue;
                }

                let u = crop.x + (cx - dest.x0) / dest.width() * crop.width;
                let v = crop.y + (cy - dest.y0) / dest.height() * crop.height;
                let src = composite::apply_filter(sample_bilinear(image, u, v), state.filter);

                let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
                let dst = [
                    self.data[idx],
                    self.data[idx + 1],
                    self.data[idx + 2],
                    self.data[idx + 3],
                ];
                let out = composite::over(dst, src, 255);
                self.data[idx..idx + 4].copy_from_slice(&out);
            }
        }

        Ok(())
    }

    /// Draw `image` stretched over the whole canvas, ignoring clip and
    /// filter state. This is the overlay path: always last, never clipped,
    /// never filtered.
    pub fn draw_overlay(&mut self, image: &PreparedImage) -> StripResult<()> {
        let mut scope = self.scope();
        scope.clear_clip();
        scope.set_filter(PhotoFilter::None);
        let crop = CropRect {
            x: 0.0,
            y: 0.0,
            width: f64::from(image.width),
            height: f64::from(image.height),
        };
        let dest = kurbo::Rect::new(0.0, 0.0, f64::from(scope.width), f64::from(scope.height));
        scope.draw_image_crop(image, crop, dest)
    }

    /// Copy out straight-alpha RGBA8.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        composite::unpremultiply_rgba8_in_place(&mut out);
        out
    }

    pub fn to_rgba_image(&self) -> StripResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba())
            .ok_or_else(|| StripError::encoding("surface buffer does not match its dimensions"))
    }

    /// Encode the canvas as a PNG buffer.
    pub fn encode_png(&self) -> StripResult<Vec<u8>> {
        let img = self.to_rgba_image()?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| StripError::encoding(format!("png encode: {e}")))?;
        Ok(buf)
    }
}

/// RAII save/restore of a [`Surface`]'s clip and filter state.
pub struct DrawScope<'a> {
    surface: &'a mut Surface,
}

impl DrawScope<'_> {
    /// Clip subsequent draws to `window`: a plain rectangle, or a rounded
    /// rectangle when the window carries a corner radius. Intersects with
    /// any pre-existing clip: a pixel passes only if every active region
    /// contains it.
    pub fn clip_window(&mut self, window: &Window) {
        let region = ClipRegion {
            rect: window.rect(),
            radius: window.border_radius,
        };
        if let Some(top) = self.surface.stack.last_mut() {
            top.clips.push(region);
        }
    }

    pub fn clear_clip(&mut self) {
        if let Some(top) = self.surface.stack.last_mut() {
            top.clips.clear();
        }
    }

    pub fn set_filter(&mut self, filter: PhotoFilter) {
        if let Some(top) = self.surface.stack.last_mut() {
            top.filter = filter;
        }
    }
}

impl Drop for DrawScope<'_> {
    fn drop(&mut self) {
        // Never pop the base state.
        if self.surface.stack.len() > 1 {
            self.surface.stack.pop();
        }
    }
}

impl std::ops::Deref for DrawScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl std::ops::DerefMut for DrawScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

/// Render one slot: save state, clip to the window, apply the slot filter,
/// draw the cover-fit crop scaled to the window, restore state.
///
/// The scope guard restores clip/filter on every exit path, so a failed draw
/// never leaks state into the next slot.
pub fn render_slot(
    surface: &mut Surface,
    image: &PreparedImage,
    window: &Window,
    filter: PhotoFilter,
) -> StripResult<()> {
    window.validate()?;
    let mut scope = surface.scope();
    scope.clip_window(window);
    scope.set_filter(filter);
    let crop = cover_fit(image.width, image.height, window.width, window.height)?;
    scope.draw_image_crop(image, crop, window.rect())
}

fn sample_bilinear(image: &PreparedImage, u: f64, v: f64) -> PremulRgba8 {
    let x = u - 0.5;
    let y = v - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let max_x = i64::from(image.width) - 1;
    let max_y = i64::from(image.height) - 1;
    let cx0 = (x0 as i64).clamp(0, max_x);
    let cy0 = (y0 as i64).clamp(0, max_y);
    let cx1 = (x0 as i64 + 1).clamp(0, max_x);
    let cy1 = (y0 as i64 + 1).clamp(0, max_y);

    let p00 = image.pixel(cx0, cy0);
    let p10 = image.pixel(cx1, cy0);
    let p01 = image.pixel(cx0, cy1);
    let p11 = image.pixel(cx1, cy1);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = f64::from(p00[i]) * (1.0 - fx) + f64::from(p10[i]) * fx;
        let bottom = f64::from(p01[i]) * (1.0 - fx) + f64::from(p11[i]) * fx;
        out[i] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
