//! Render results and the observable preview states they drive.

use bytes::Bytes;

/// Result of a single render request once it has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The request was superseded or aborted; it has no observable effect.
    Cancelled,
    /// The service produced an image; the body has been read in full.
    Succeeded(Bytes),
    /// The service rejected the content or the transport failed.
    Failed(String),
}

impl RenderOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Observable state of the preview surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreviewState {
    /// Nothing has been rendered yet.
    #[default]
    Idle,
    /// A render is outstanding; whatever was shown before is stale.
    Pending,
    /// An artifact is displayed.
    Success,
    /// A diagnostic is displayed and the artifact is hidden.
    Error(String),
}

impl PreviewState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error(_) => "error",
        }
    }
}
