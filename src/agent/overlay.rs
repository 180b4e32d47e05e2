use std::time::Duration;

use crate::domain::ImageDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayPhase {
    Shown,
    DragOver,
    Downloading,
    Success,
    Error(String),
}

impl OverlayPhase {
    /// Still waiting for a drop
    pub fn is_idle(&self) -> bool {
        matches!(self, OverlayPhase::Shown | OverlayPhase::DragOver)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OverlayPhase::Success | OverlayPhase::Error(_))
    }

    pub fn content(&self) -> OverlayContent {
        let (icon, text, subtext) = match self {
            OverlayPhase::Shown | OverlayPhase::DragOver => {
                ("📁", "Drop to Download", "Release to save image".to_string())
            }
            OverlayPhase::Downloading => ("⏳", "Downloading...", "Please wait".to_string()),
            OverlayPhase::Success => ("✅", "Downloaded!", "Image saved".to_string()),
            OverlayPhase::Error(message) => ("❌", "Error", message.clone()),
        };
        OverlayContent {
            icon,
            text,
            subtext,
            highlighted: matches!(self, OverlayPhase::DragOver),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayContent {
    pub icon: &'static str,
    pub text: &'static str,
    pub subtext: String,
    pub highlighted: bool,
}

/// The floating drop target shown while an image is dragged.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: OverlayId,
    pub descriptor: ImageDescriptor,
    pub phase: OverlayPhase,
}

impl Overlay {
    pub fn new(id: OverlayId, descriptor: ImageDescriptor) -> Self {
        Self {
            id,
            descriptor,
            phase: OverlayPhase::Shown,
        }
    }

    pub fn content(&self) -> OverlayContent {
        self.phase.content()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissKind {
    /// The drag ended without a drop being handled
    DragEnded,
    /// The download outcome has been shown
    Finished,
}

/// A request to hide a specific overlay once `after` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dismissal {
    pub overlay: OverlayId,
    pub after: Duration,
    pub kind: DismissKind,
}

impl Dismissal {
    /// Whether this dismissal may still hide `overlay`.
    pub fn applies_to(&self, overlay: &Overlay) -> bool {
        overlay.id == self.overlay
            && match self.kind {
                DismissKind::DragEnded => overlay.phase.is_idle(),
                DismissKind::Finished => true,
            }
    }
}
