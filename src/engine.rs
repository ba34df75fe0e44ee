use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    animate::{CancelToken, ExportProgress, compose_animated},
    assets::DecodeOpts,
    compose::compose_still,
    error::{StripError, StripResult},
    mapping::MappingRegistry,
    model::{CapturedImage, CompositionResult, DesignOverlay, OverlayState, PhotoFilter},
};

/// The export engine: one composition at a time, against a fixed mapping
/// registry.
///
/// The busy flag mirrors what the UI needs to disable its export trigger:
/// it is set for the duration of any export and a second export request
/// while it is set fails with [`StripError::ExportBusy`].
pub struct ExportEngine {
    registry: MappingRegistry,
    opts: DecodeOpts,
    busy: AtomicBool,
}

impl ExportEngine {
    pub fn new(registry: MappingRegistry) -> Self {
        Self {
            registry,
            opts: DecodeOpts::default(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_decode_opts(mut self, opts: DecodeOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> StripResult<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StripError::ExportBusy)?;
        Ok(BusyGuard(&self.busy))
    }

    /// Compose the captured stills into one PNG strip.
    pub fn export_still(
        &self,
        captured: &[CapturedImage],
        design: Option<&DesignOverlay>,
        filters: &[PhotoFilter],
    ) -> StripResult<CompositionResult> {
        let _guard = self.begin()?;
        compose_still(captured, design, filters, &self.registry, &self.opts)
    }

    /// Compose the captured clips into one looping GIF strip.
    pub fn export_animated(
        &self,
        captured: &[CapturedImage],
        design_key: &str,
        overlay: &OverlayState,
    ) -> StripResult<CompositionResult> {
        self.export_animated_with(captured, design_key, overlay, &CancelToken::new(), &mut |_| {})
    }

    /// [`export_animated`](Self::export_animated) with a cancellation token
    /// and a per-frame progress callback.
    pub fn export_animated_with(
        &self,
        captured: &[CapturedImage],
        design_key: &str,
        overlay: &OverlayState,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> StripResult<CompositionResult> {
        let _guard = self.begin()?;
        compose_animated(
            captured,
            design_key,
            overlay,
            &self.registry,
            &self.opts,
            cancel,
            progress,
        )
    }
}

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
