pub type StripResult<T> = Result<T, StripError>;

#[derive(thiserror::Error, Debug)]
pub enum StripError {
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// Animated export was requested before the overlay finished loading.
    /// Recoverable: the caller should retry once the overlay is ready.
    #[error("overlay is not ready yet; retry after it finishes loading")]
    OverlayNotReady,

    #[error("no animatable input: {0}")]
    NoAnimatableInput(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode timed out: {0}")]
    DecodeTimeout(String),

    #[error("export was canceled")]
    Canceled,

    #[error("an export is already in flight")]
    ExportBusy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StripError {
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn no_animatable_input(msg: impl Into<String>) -> Self {
        Self::NoAnimatableInput(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode_timeout(msg: impl Into<String>) -> Self {
        Self::DecodeTimeout(msg.into())
    }

    /// True for failures the caller may resolve by simply retrying later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OverlayNotReady | Self::ExportBusy)
    }
}
