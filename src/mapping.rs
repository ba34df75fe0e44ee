use std::collections::BTreeMap;

use crate::{
    error::{StripError, StripResult},
    model::MAX_SLOTS,
};

fn default_radius() -> f64 {
    0.0
}

/// The region of the output canvas reserved for one photo slot.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Window {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_radius")]
    pub border_radius: f64,
}

impl Window {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            border_radius: 0.0,
        }
    }

    pub fn with_radius(mut self, border_radius: f64) -> Self {
        self.border_radius = border_radius;
        self
    }

    pub fn rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    pub fn validate(&self) -> StripResult<()> {
        let finite = [self.left, self.top, self.width, self.height, self.border_radius]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(StripError::validation("window fields must be finite"));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(StripError::validation("window width/height must be > 0"));
        }
        if self.left < 0.0 || self.top < 0.0 {
            return Err(StripError::validation("window left/top must be >= 0"));
        }
        if self.border_radius < 0.0 {
            return Err(StripError::validation("window border_radius must be >= 0"));
        }
        // Quarter-circle corners must not overlap.
        if self.border_radius > self.width.min(self.height) / 2.0 {
            return Err(StripError::validation(
                "window border_radius must be <= half the short side",
            ));
        }
        Ok(())
    }
}

/// A design's template: output canvas size plus one window per photo slot,
/// in slot order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameMapping {
    pub frame_width: u32,
    pub frame_height: u32,
    pub windows: Vec<Window>,
}

impl FrameMapping {
    pub fn slot_count(&self) -> usize {
        self.windows.len()
    }

    pub fn validate(&self) -> StripResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(StripError::validation(
                "mapping frame width/height must be > 0",
            ));
        }
        if self.windows.is_empty() {
            return Err(StripError::validation(
                "mapping must define at least one window",
            ));
        }
        if self.windows.len() > MAX_SLOTS {
            return Err(StripError::validation(format!(
                "mapping defines {} windows, maximum is {MAX_SLOTS}",
                self.windows.len()
            )));
        }
        for (i, win) in self.windows.iter().enumerate() {
            win.validate()
                .map_err(|e| StripError::validation(format!("window {i}: {e}")))?;
            if win.left + win.width > f64::from(self.frame_width) + 1e-6
                || win.top + win.height > f64::from(self.frame_height) + 1e-6
            {
                return Err(StripError::validation(format!(
                    "window {i} extends past the canvas"
                )));
            }
        }
        Ok(())
    }
}

/// Read-only lookup table from design key to [`FrameMapping`]. Entries are
/// validated when the registry is built and never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct MappingRegistry {
    entries: BTreeMap<String, FrameMapping>,
}

impl MappingRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The designs that ship with the engine.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();

        // Classic four-shot vertical strip with rounded windows.
        entries.insert(
            "classic-strip".to_string(),
            FrameMapping {
                frame_width: 420,
                frame_height: 1360,
                windows: vec![
                    Window::new(30.0, 40.0, 360.0, 300.0).with_radius(12.0),
                    Window::new(30.0, 360.0, 360.0, 300.0).with_radius(12.0),
                    Window::new(30.0, 680.0, 360.0, 300.0).with_radius(12.0),
                    Window::new(30.0, 1000.0, 360.0, 300.0).with_radius(12.0),
                ],
            },
        );

        // Two large frames stacked.
        entries.insert(
            "twin-frame".to_string(),
            FrameMapping {
                frame_width: 640,
                frame_height: 1000,
                windows: vec![
                    Window::new(80.0, 60.0, 480.0, 380.0).with_radius(16.0),
                    Window::new(80.0, 520.0, 480.0, 380.0).with_radius(16.0),
                ],
            },
        );

        // Six square windows, two columns.
        entries.insert(
            "six-grid".to_string(),
            FrameMapping {
                frame_width: 900,
                frame_height: 1300,
                windows: vec![
                    Window::new(60.0, 80.0, 360.0, 360.0),
                    Window::new(480.0, 80.0, 360.0, 360.0),
                    Window::new(60.0, 480.0, 360.0, 360.0),
                    Window::new(480.0, 480.0, 360.0, 360.0),
                    Window::new(60.0, 880.0, 360.0, 360.0),
                    Window::new(480.0, 880.0, 360.0, 360.0),
                ],
            },
        );

        // Single polaroid-style frame.
        entries.insert(
            "polaroid-solo".to_string(),
            FrameMapping {
                frame_width: 600,
                frame_height: 720,
                windows: vec![Window::new(50.0, 50.0, 500.0, 500.0).with_radius(8.0)],
            },
        );

        let registry = Self { entries };
        debug_assert!(registry.entries.values().all(|m| m.validate().is_ok()));
        registry
    }

    /// Load a registry from a JSON object of `key -> mapping`, validating
    /// every entry.
    pub fn from_json(bytes: &[u8]) -> StripResult<Self> {
        let entries: BTreeMap<String, FrameMapping> = serde_json::from_slice(bytes)
            .map_err(|e| StripError::validation(format!("mapping registry json: {e}")))?;
        for (key, mapping) in &entries {
            mapping
                .validate()
                .map_err(|e| StripError::validation(format!("mapping '{key}': {e}")))?;
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, design_key: &str) -> Option<&FrameMapping> {
        self.entries.get(design_key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
