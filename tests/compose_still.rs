use stripbooth::{
    CapturedImage, CompositionResult, DesignOverlay, ExportEngine, ExportKind, MappingRegistry,
    PhotoFilter,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn png_solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn decode_result(result: &CompositionResult) -> image::RgbaImage {
    let CompositionResult::Still { png, .. } = result else {
        panic!("expected a still result");
    };
    image::load_from_memory(png).unwrap().to_rgba8()
}

#[test]
fn one_image_no_design_gives_a_single_cell_strip() {
    init_tracing();
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured = vec![CapturedImage::still_only(png_solid(64, 48, [20, 120, 220, 255]))];

    let result = engine.export_still(&captured, None, &[]).unwrap();
    assert_eq!(result.kind(), ExportKind::Still);
    assert_eq!(result.dimensions(), (180, 160));

    let out = decode_result(&result);
    // Entire canvas is the stretched photo; nothing else was drawn.
    assert_eq!(out.get_pixel(0, 0).0, [20, 120, 220, 255]);
    assert_eq!(out.get_pixel(90, 80).0, [20, 120, 220, 255]);
    assert_eq!(out.get_pixel(179, 159).0, [20, 120, 220, 255]);
}

#[test]
fn six_images_no_design_gives_a_two_column_grid() {
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured: Vec<_> = (0..6)
        .map(|_| CapturedImage::still_only(png_solid(32, 32, [200, 100, 50, 255])))
        .collect();

    let result = engine.export_still(&captured, None, &[]).unwrap();
    // 2 * 180 + 16 by 3 * 160 + 2 * 16.
    assert_eq!(result.dimensions(), (376, 512));

    let out = decode_result(&result);
    // Both columns are filled.
    assert_eq!(out.get_pixel(10, 10).0, [200, 100, 50, 255]);
    assert_eq!(out.get_pixel(206, 10).0, [200, 100, 50, 255]);
    // The gap between columns stays empty.
    assert_eq!(out.get_pixel(185, 50).0[3], 0);
    // The gap between rows stays empty.
    assert_eq!(out.get_pixel(50, 168).0[3], 0);
}

#[test]
fn mapped_export_matches_mapping_canvas_and_rounds_corners() {
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured: Vec<_> = (0..4)
        .map(|_| CapturedImage::still_only(png_solid(400, 400, [255, 255, 255, 255])))
        .collect();
    let design = DesignOverlay {
        key: "classic-strip".to_string(),
        overlay: png_solid(420, 1360, [0, 0, 0, 0]),
    };

    let result = engine.export_still(&captured, Some(&design), &[]).unwrap();
    assert_eq!(result.dimensions(), (420, 1360));

    let out = decode_result(&result);
    // First window spans (30,40)..(390,340) with radius 12: its square
    // corner is clipped away, its interior and edge midpoints are filled.
    assert_eq!(out.get_pixel(30, 40).0[3], 0);
    assert_eq!(out.get_pixel(389, 40).0[3], 0);
    assert_eq!(out.get_pixel(210, 190).0, [255, 255, 255, 255]);
    assert_eq!(out.get_pixel(210, 41).0, [255, 255, 255, 255]);
    // Outside every window (the transparent overlay adds nothing).
    assert_eq!(out.get_pixel(5, 5).0[3], 0);
    assert_eq!(out.get_pixel(210, 350).0[3], 0);
}

#[test]
fn opaque_overlay_regions_cover_photo_pixels() {
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured: Vec<_> = (0..4)
        .map(|_| CapturedImage::still_only(png_solid(100, 100, [255, 0, 0, 255])))
        .collect();
    let design = DesignOverlay {
        key: "classic-strip".to_string(),
        overlay: png_solid(420, 1360, [10, 30, 90, 255]),
    };

    let result = engine.export_still(&captured, Some(&design), &[]).unwrap();
    let out = decode_result(&result);
    // Overlay is drawn after all slots and unclipped, so it wins everywhere.
    assert_eq!(out.get_pixel(210, 190).0, [10, 30, 90, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [10, 30, 90, 255]);
}

#[test]
fn per_slot_filters_apply_to_their_photo_only() {
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured: Vec<_> = (0..2)
        .map(|_| CapturedImage::still_only(png_solid(32, 32, [200, 0, 0, 255])))
        .collect();

    let result = engine
        .export_still(&captured, None, &[PhotoFilter::Grayscale, PhotoFilter::None])
        .unwrap();
    let out = decode_result(&result);

    // Slot 0 (top cell) is gray, slot 1 keeps its color.
    let top = out.get_pixel(90, 80).0;
    assert_eq!(top[0], top[1]);
    assert_eq!(top[1], top[2]);
    let bottom = out.get_pixel(90, 176 + 80).0;
    assert_eq!(bottom, [200, 0, 0, 255]);
}

#[test]
fn unknown_design_key_falls_back_to_the_grid() {
    let engine = ExportEngine::new(MappingRegistry::builtin());
    let captured = vec![CapturedImage::still_only(png_solid(16, 16, [5, 6, 7, 255]))];
    let design = DesignOverlay {
        key: "never-registered".to_string(),
        overlay: png_solid(180, 160, [0, 0, 0, 0]),
    };

    let result = engine.export_still(&captured, Some(&design), &[]).unwrap();
    assert_eq!(result.dimensions(), (180, 160));
}
