//! Page-side logic: tracks draggable images, owns the floating drop overlay
//! and relays dropped images to the background coordinator.

pub mod overlay;
pub mod transport;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::ImageDescriptor;

pub use overlay::{DismissKind, Dismissal, Overlay, OverlayContent, OverlayId, OverlayPhase};
pub use transport::{
    request_download, CoordinatorMessenger, RuntimeMessenger, SendError, TransportError,
};

const CONTEXT_LOST_ON_DROP: &str = "Extension context lost - please reload page";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// An `<img>` element as the page reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageElement {
    pub id: ElementId,
    pub src: String,
    pub alt: String,
    pub title: String,
    pub natural_width: u32,
    pub natural_height: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageElement {
    /// Natural size when the image has loaded, layout size otherwise.
    pub fn descriptor(&self) -> ImageDescriptor {
        let pick = |natural: u32, layout: u32| if natural > 0 { natural } else { layout };
        ImageDescriptor {
            src: self.src.clone(),
            alt: self.alt.clone(),
            title: self.title.clone(),
            width: pick(self.natural_width, self.width),
            height: pick(self.natural_height, self.height),
        }
    }
}

/// A subtree inserted into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNode {
    Image(ImageElement),
    Element(Vec<PageNode>),
    Text(String),
}

impl PageNode {
    fn collect_images<'a>(&'a self, out: &mut Vec<&'a ImageElement>) {
        match self {
            PageNode::Image(image) => out.push(image),
            PageNode::Element(children) => {
                for child in children {
                    child.collect_images(out);
                }
            }
            PageNode::Text(_) => {}
        }
    }
}

/// Drag payload offered to the page in its three representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferData {
    pub html: String,
    pub uri_list: String,
    pub plain: String,
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl TransferData {
    fn for_image(image: &ImageElement) -> Self {
        Self {
            html: format!(
                r#"<img src="{}" alt="{}" title="{}">"#,
                escape_attr(&image.src),
                escape_attr(&image.alt),
                escape_attr(&image.title)
            ),
            uri_list: image.src.clone(),
            plain: image.src.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub message_timeout: Duration,
    pub drag_end_dismiss: Duration,
    pub success_dismiss: Duration,
    pub error_dismiss: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            message_timeout: Duration::from_secs(5),
            drag_end_dismiss: Duration::from_millis(500),
            success_dismiss: Duration::from_millis(1500),
            error_dismiss: Duration::from_secs(3),
        }
    }
}

pub struct PageAgent {
    messenger: Arc<dyn RuntimeMessenger>,
    settings: AgentSettings,
    tracked: HashSet<ElementId>,
    dimmed: HashSet<ElementId>,
    overlay: Option<Overlay>,
    next_overlay: u64,
    observing: bool,
}

impl PageAgent {
    pub fn new(messenger: Arc<dyn RuntimeMessenger>, settings: AgentSettings) -> Self {
        Self {
            messenger,
            settings,
            tracked: HashSet::new(),
            dimmed: HashSet::new(),
            overlay: None,
            next_overlay: 0,
            observing: false,
        }
    }

    /// Attach to the images already in the page and start watching for more.
    /// Does nothing when the extension context is already gone.
    pub fn init(&mut self, document: &[PageNode]) -> usize {
        if !self.messenger.is_context_valid() {
            return 0;
        }
        self.observing = true;
        self.attach_nodes(document)
    }

    /// Mutation callback for nodes inserted anywhere under the body.
    pub fn on_nodes_added(&mut self, nodes: &[PageNode]) -> usize {
        if !self.observing {
            return 0;
        }
        if !self.messenger.is_context_valid() {
            tracing::debug!("Extension context gone, disconnecting observer");
            self.observing = false;
            return 0;
        }
        self.attach_nodes(nodes)
    }

    fn attach_nodes(&mut self, nodes: &[PageNode]) -> usize {
        let mut images = Vec::new();
        for node in nodes {
            node.collect_images(&mut images);
        }
        images
            .into_iter()
            .filter(|image| self.tracked.insert(image.id))
            .count()
    }

    pub fn is_tracked(&self, id: ElementId) -> bool {
        self.tracked.contains(&id)
    }

    pub fn is_dimmed(&self, id: ElementId) -> bool {
        self.dimmed.contains(&id)
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn on_drag_start(&mut self, image: &ImageElement) -> Option<TransferData> {
        if !self.tracked.contains(&image.id) || !self.messenger.is_context_valid() {
            return None;
        }

        let transfer = TransferData::for_image(image);
        self.show_overlay(image.descriptor());
        self.dimmed.insert(image.id);
        Some(transfer)
    }

    pub fn on_drag_end(&mut self, id: ElementId) -> Option<Dismissal> {
        self.dimmed.remove(&id);
        self.overlay.as_ref().map(|overlay| Dismissal {
            overlay: overlay.id,
            after: self.settings.drag_end_dismiss,
            kind: DismissKind::DragEnded,
        })
    }

    pub fn on_drag_enter(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            if overlay.phase == OverlayPhase::Shown {
                overlay.phase = OverlayPhase::DragOver;
            }
        }
    }

    /// `left_overlay` is false when the pointer only moved onto a child of the overlay.
    pub fn on_drag_leave(&mut self, left_overlay: bool) {
        if let Some(overlay) = self.overlay.as_mut() {
            if left_overlay && overlay.phase == OverlayPhase::DragOver {
                overlay.phase = OverlayPhase::Shown;
            }
        }
    }

    /// Handle a drop on the overlay: hand the image to the background side and
    /// show the outcome. Returns when the overlay should be dismissed.
    pub async fn on_drop(&mut self) -> Option<Dismissal> {
        let (id, descriptor) = {
            let overlay = self.overlay.as_mut()?;
            if !overlay.phase.is_idle() {
                return None;
            }
            overlay.phase = OverlayPhase::Shown;
            (overlay.id, overlay.descriptor.clone())
        };

        if !self.messenger.is_context_valid() {
            return Some(self.finish(id, Err(CONTEXT_LOST_ON_DROP.to_string())));
        }

        self.set_phase(id, OverlayPhase::Downloading);
        let result = request_download(
            self.messenger.as_ref(),
            descriptor,
            self.settings.message_timeout,
        )
        .await
        .map_err(|e| e.to_string());

        Some(self.finish(id, result))
    }

    /// Hide the overlay if `dismissal` still applies to it.
    pub fn dismiss(&mut self, dismissal: Dismissal) -> bool {
        match &self.overlay {
            Some(overlay) if dismissal.applies_to(overlay) => {
                self.overlay = None;
                true
            }
            _ => false,
        }
    }

    fn show_overlay(&mut self, descriptor: ImageDescriptor) -> OverlayId {
        if let Some(previous) = self.overlay.take() {
            tracing::debug!("Tearing down overlay {:?}", previous.id);
        }
        self.next_overlay += 1;
        let id = OverlayId(self.next_overlay);
        self.overlay = Some(Overlay::new(id, descriptor));
        id
    }

    fn set_phase(&mut self, id: OverlayId, phase: OverlayPhase) {
        match self.overlay.as_mut() {
            Some(overlay) if overlay.id == id => overlay.phase = phase,
            _ => tracing::debug!("Overlay {:?} is gone, dropping phase {:?}", id, phase),
        }
    }

    fn finish(&mut self, id: OverlayId, result: Result<(), String>) -> Dismissal {
        let (phase, after) = match result {
            Ok(()) => (OverlayPhase::Success, self.settings.success_dismiss),
            Err(message) => {
                tracing::warn!("Drop download failed: {}", message);
                (OverlayPhase::Error(message), self.settings.error_dismiss)
            }
        };
        self.set_phase(id, phase);
        Dismissal {
            overlay: id,
            after,
            kind: DismissKind::Finished,
        }
    }
}
