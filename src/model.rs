use std::time::SystemTime;

use crate::mapping::FrameMapping;

/// Hard ceiling on photo slots per strip. Mappings and capture sets beyond
/// this are rejected up front instead of rendering unboundedly.
pub const MAX_SLOTS: usize = 12;

/// One user-captured photo: the encoded still payload, its capture time, and
/// an optional encoded looping-clip (GIF) payload recorded alongside it.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub still: Vec<u8>,
    pub captured_at: SystemTime,
    pub clip: Option<Vec<u8>>,
}

impl CapturedImage {
    pub fn still_only(still: Vec<u8>) -> Self {
        Self {
            still,
            captured_at: SystemTime::now(),
            clip: None,
        }
    }

    pub fn with_clip(still: Vec<u8>, clip: Vec<u8>) -> Self {
        Self {
            still,
            captured_at: SystemTime::now(),
            clip: Some(clip),
        }
    }
}

/// A decorative template: its registry key plus the encoded transparent
/// overlay image that is drawn last over the full canvas.
#[derive(Clone, Debug)]
pub struct DesignOverlay {
    pub key: String,
    pub overlay: Vec<u8>,
}

/// Overlay readiness as seen by the animated pipeline. Decoding the overlay
/// is the caller's job (it usually happens when a design is selected); the
/// engine refuses to start an animated export until it is `Ready`.
#[derive(Clone, Debug)]
pub enum OverlayState {
    Loading,
    Ready(crate::assets::PreparedImage),
}

/// Per-slot visual adjustment. Applied to photo pixels only, never to the
/// overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
}

/// How the strip is laid out, resolved once per export: either a registered
/// frame mapping, or the uniform grid used when no mapping matches.
#[derive(Clone, Debug)]
pub enum LayoutStrategy {
    Mapped(FrameMapping),
    Grid { columns: u32 },
}

impl LayoutStrategy {
    /// Grid shape used when no frame mapping matches: two columns for the
    /// six-shot strip, a single column for every other count.
    pub fn grid_for(shot_count: usize) -> Self {
        let columns = if shot_count == 6 { 2 } else { 1 };
        Self::Grid { columns }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Still,
    Animated,
}

/// The output artifact. Produced fresh on every export request.
#[derive(Clone, Debug)]
pub enum CompositionResult {
    Still {
        png: Vec<u8>,
        width: u32,
        height: u32,
    },
    Animated {
        gif: Vec<u8>,
        width: u32,
        height: u32,
        frame_count: u32,
    },
}

impl CompositionResult {
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Still { .. } => ExportKind::Still,
            Self::Animated { .. } => ExportKind::Animated,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Still { width, height, .. } => (*width, *height),
            Self::Animated { width, height, .. } => (*width, *height),
        }
    }
}
