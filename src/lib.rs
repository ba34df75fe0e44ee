//! Photo-strip compositing and animated-export engine.
//!
//! Takes N captured photos (optionally with short looping clips), a
//! declarative frame mapping for a decorative template, and per-photo
//! filters, and deterministically renders one composed artifact: a PNG
//! strip or an infinitely looping GIF.

#![forbid(unsafe_code)]

pub mod animate;
pub mod assets;
pub mod compose;
pub mod composite;
pub mod encode_gif;
pub mod engine;
pub mod error;
pub mod geom;
pub mod mapping;
pub mod model;
pub mod surface;

pub use animate::{CancelToken, ExportProgress, compose_animated};
pub use assets::{DecodeOpts, PreparedImage};
pub use compose::{compose_still, resolve_layout};
pub use engine::ExportEngine;
pub use error::{StripError, StripResult};
pub use geom::{CropRect, cover_fit};
pub use mapping::{FrameMapping, MappingRegistry, Window};
pub use model::{
    CapturedImage, CompositionResult, DesignOverlay, ExportKind, LayoutStrategy, OverlayState,
    PhotoFilter,
};
pub use surface::{Surface, render_slot};
