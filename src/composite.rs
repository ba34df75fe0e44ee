use crate::model::PhotoFilter;

/// One premultiplied RGBA8 pixel (r,g,b already multiplied by a).
pub type PremulRgba8 = [u8; 4];

/// Source-over blend of premultiplied pixels, with an extra coverage factor
/// in 0..=255 (used for antialiased clip edges).
pub fn over(dst: PremulRgba8, src: PremulRgba8, coverage: u8) -> PremulRgba8 {
    if coverage == 0 || src[3] == 0 {
        return dst;
    }

    let cov = u16::from(coverage);
    let sa = mul_div255(u16::from(src[3]), cov);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), cov);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Apply a photo filter to one premultiplied pixel.
pub fn apply_filter(px: PremulRgba8, filter: PhotoFilter) -> PremulRgba8 {
    match filter {
        PhotoFilter::None => px,
        PhotoFilter::Grayscale => {
            // Rec.601 luma in fixed point; linear, so valid on premul values.
            let luma = (u32::from(px[0]) * 77 + u32::from(px[1]) * 150 + u32::from(px[2]) * 29
                + 128)
                >> 8;
            let l = luma.min(255) as u8;
            [l, l, l, px[3]]
        }
        PhotoFilter::Sepia => {
            let r = u32::from(px[0]);
            let g = u32::from(px[1]);
            let b = u32::from(px[2]);
            // Standard sepia matrix in fixed point. The row sums exceed 1, so
            // clamp each channel back under alpha to keep the pixel premultiplied.
            let a = u32::from(px[3]);
            let sr = ((r * 100 + g * 197 + b * 48 + 128) >> 8).min(a);
            let sg = ((r * 89 + g * 175 + b * 43 + 128) >> 8).min(a);
            let sb = ((r * 69 + g * 137 + b * 33 + 128) >> 8).min(a);
            [sr as u8, sg as u8, sb as u8, px[3]]
        }
    }
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Inverse of [`premultiply_rgba8_in_place`], used before handing pixels to
/// straight-alpha encoders.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((u16::from(px[0]) * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((u16::from(px[1]) * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((u16::from(px[2]) * 255 + a / 2) / a).min(255) as u8;
    }
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
