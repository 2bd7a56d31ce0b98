use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;

use crate::events::DeviceEvent;
use crate::xr::XrFeature;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RuntimeError(pub String);

/// Unsolicited notifications from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    Device(DeviceEvent),
    /// The runtime ended the session without a stop request.
    SessionEnded,
}

/// Shared queue the runtime pushes notifications into. Drained once per frame
/// so callbacks never touch scene state directly.
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<VecDeque<RuntimeEvent>>>);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: RuntimeEvent) {
        self.0.borrow_mut().push_back(event);
    }

    pub fn drain(&self) -> Vec<RuntimeEvent> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Immersive runtime seam. Implemented by the browser WebXR adapter and by
/// the in-process headless runtime.
#[allow(async_fn_in_trait)]
pub trait XrRuntime {
    async fn is_session_supported(&self) -> Result<bool, RuntimeError>;

    async fn is_feature_supported(&self, feature: XrFeature) -> Result<bool, RuntimeError>;

    async fn request_session(
        &mut self,
        required: &[XrFeature],
        optional: &[XrFeature],
    ) -> Result<(), RuntimeError>;

    /// Attaches the render surface to the session's frame loop.
    fn bind_render_surface(&mut self) -> Result<(), RuntimeError>;

    fn release_render_surface(&mut self);

    /// Starts delivering notifications into `queue` until `unsubscribe`.
    fn subscribe(&mut self, queue: EventQueue);

    fn unsubscribe(&mut self);

    async fn end_session(&mut self) -> Result<(), RuntimeError>;
}
