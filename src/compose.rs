use crate::{
    assets::{DecodeOpts, decode::decode_image, decode::decode_stills},
    error::{StripError, StripResult},
    geom::CropRect,
    mapping::MappingRegistry,
    model::{
        CapturedImage, CompositionResult, DesignOverlay, LayoutStrategy, MAX_SLOTS, PhotoFilter,
    },
    surface::{Surface, render_slot},
};

/// Fallback grid geometry: fixed cell size and gap.
pub const GRID_CELL_WIDTH: u32 = 180;
pub const GRID_CELL_HEIGHT: u32 = 160;
pub const GRID_GAP: u32 = 16;

/// Resolve how a strip will be laid out, once per export.
///
/// A design key that matches a registered mapping gives the mapped layout;
/// anything else (no key, unknown key) falls back to the uniform grid. A
/// matching mapping whose window count disagrees with the capture count is a
/// configuration error, not a fallback case.
pub fn resolve_layout(
    shot_count: usize,
    design_key: Option<&str>,
    registry: &MappingRegistry,
) -> StripResult<LayoutStrategy> {
    if shot_count == 0 {
        return Err(StripError::validation("no captured images to compose"));
    }
    if shot_count > MAX_SLOTS {
        return Err(StripError::validation(format!(
            "{shot_count} captured images exceeds the {MAX_SLOTS} slot limit"
        )));
    }

    if let Some(key) = design_key
        && let Some(mapping) = registry.lookup(key)
    {
        if mapping.slot_count() != shot_count {
            return Err(StripError::validation(format!(
                "design '{key}' expects {} images, got {shot_count}",
                mapping.slot_count()
            )));
        }
        return Ok(LayoutStrategy::Mapped(mapping.clone()));
    }

    Ok(LayoutStrategy::grid_for(shot_count))
}

/// Canvas size of the fallback grid for `shot_count` images.
pub fn grid_canvas_size(shot_count: usize, columns: u32) -> (u32, u32) {
    let cols = columns.max(1);
    let rows = (shot_count as u32).div_ceil(cols);
    let width = cols * GRID_CELL_WIDTH + (cols - 1) * GRID_GAP;
    let height = rows * GRID_CELL_HEIGHT + (rows - 1) * GRID_GAP;
    (width, height)
}

fn grid_cell_rect(slot: usize, columns: u32) -> kurbo::Rect {
    let col = (slot as u32) % columns.max(1);
    let row = (slot as u32) / columns.max(1);
    let x = f64::from(col * (GRID_CELL_WIDTH + GRID_GAP));
    let y = f64::from(row * (GRID_CELL_HEIGHT + GRID_GAP));
    kurbo::Rect::new(
        x,
        y,
        x + f64::from(GRID_CELL_WIDTH),
        y + f64::from(GRID_CELL_HEIGHT),
    )
}

/// Snapshot the caller's filter selections, defaulting missing entries to
/// no filter.
fn snapshot_filters(filters: &[PhotoFilter], shot_count: usize) -> StripResult<Vec<PhotoFilter>> {
    if filters.is_empty() {
        return Ok(vec![PhotoFilter::None; shot_count]);
    }
    if filters.len() != shot_count {
        return Err(StripError::validation(format!(
            "got {} filters for {shot_count} images",
            filters.len()
        )));
    }
    Ok(filters.to_vec())
}

/// Compose all captured stills plus the optional overlay into one PNG strip.
///
/// Slot decoding may run in parallel; drawing is strictly sequential in slot
/// order because clip/filter state lives on the one shared surface.
pub fn compose_still(
    captured: &[CapturedImage],
    design: Option<&DesignOverlay>,
    filters: &[PhotoFilter],
    registry: &MappingRegistry,
    opts: &DecodeOpts,
) -> StripResult<CompositionResult> {
    let layout = resolve_layout(captured.len(), design.map(|d| d.key.as_str()), registry)?;
    let filters = snapshot_filters(filters, captured.len())?;

    let stills: Vec<Vec<u8>> = captured.iter().map(|c| c.still.clone()).collect();
    let images = decode_stills(&stills, opts.timeout)?;

    let mut surface = match &layout {
        LayoutStrategy::Mapped(mapping) => Surface::new(mapping.frame_width, mapping.frame_height),
        LayoutStrategy::Grid { columns } => {
            let (w, h) = grid_canvas_size(captured.len(), *columns);
            Surface::new(w, h)
        }
    }?;

    match &layout {
        LayoutStrategy::Mapped(mapping) => {
            for (i, image) in images.iter().enumerate() {
                render_slot(&mut surface, image, &mapping.windows[i], filters[i])?;
            }
        }
        LayoutStrategy::Grid { columns } => {
            // Grid cells are filled by stretching, not cover-fitting, and
            // carry no clip shape.
            for (i, image) in images.iter().enumerate() {
                let mut scope = surface.scope();
                scope.set_filter(filters[i]);
                let crop = CropRect {
                    x: 0.0,
                    y: 0.0,
                    width: f64::from(image.width),
                    height: f64::from(image.height),
                };
                scope.draw_image_crop(image, crop, grid_cell_rect(i, *columns))?;
            }
        }
    }

    if let Some(design) = design {
        let overlay = decode_image(&design.overlay)
            .map_err(|e| StripError::image_load(format!("overlay '{}': {e}", design.key)))?;
        surface.draw_overlay(&overlay)?;
    }

    Ok(CompositionResult::Still {
        png: surface.encode_png()?,
        width: surface.width(),
        height: surface.height(),
    })
}
