//! In-process runtime without a headset. Natively it reports immersive
//! sessions as unsupported; tests script it to connect devices, reject
//! requests or end the session from the runtime side.

use bevy_utils::HashSet;

use crate::events::DeviceEvent;
use crate::input::{DeviceKind, InputSlot};
use crate::xr::{EventQueue, RuntimeError, RuntimeEvent, XrFeature, XrRuntime};

#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    supported: bool,
    support_query_fails: bool,
    features: HashSet<XrFeature>,
    failing_feature_queries: HashSet<XrFeature>,
    reject_next: Option<String>,
    surface_fails: bool,
    session_open: bool,
    surface_bound: bool,
    queue: Option<EventQueue>,
    requests: Vec<(Vec<XrFeature>, Vec<XrFeature>)>,
}

impl HeadlessRuntime {
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn supported() -> Self {
        Self {
            supported: true,
            ..Self::default()
        }
    }

    pub fn with_feature(mut self, feature: XrFeature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn with_failing_support_query(mut self) -> Self {
        self.support_query_fails = true;
        self
    }

    pub fn with_failing_feature_query(mut self, feature: XrFeature) -> Self {
        self.failing_feature_queries.insert(feature);
        self
    }

    pub fn with_failing_surface(mut self) -> Self {
        self.surface_fails = true;
        self
    }

    pub fn reject_next_request(&mut self, reason: &str) {
        self.reject_next = Some(reason.to_string());
    }

    pub fn connect(&self, slot: InputSlot, kind: DeviceKind) {
        self.push(RuntimeEvent::Device(DeviceEvent::Connected { slot, kind }));
    }

    pub fn disconnect(&self, slot: InputSlot) {
        self.push(RuntimeEvent::Device(DeviceEvent::Disconnected { slot }));
    }

    /// Simulates the device or OS ending the session.
    pub fn end_externally(&mut self) {
        self.session_open = false;
        self.push(RuntimeEvent::SessionEnded);
    }

    pub fn is_session_open(&self) -> bool {
        self.session_open
    }

    pub fn is_surface_bound(&self) -> bool {
        self.surface_bound
    }

    pub fn is_subscribed(&self) -> bool {
        self.queue.is_some()
    }

    pub fn requests(&self) -> &[(Vec<XrFeature>, Vec<XrFeature>)] {
        &self.requests
    }

    fn push(&self, event: RuntimeEvent) {
        match &self.queue {
            Some(queue) => queue.push(event),
            None => log::debug!("headless runtime: dropping {:?}, nobody subscribed", event),
        }
    }
}

impl XrRuntime for HeadlessRuntime {
    async fn is_session_supported(&self) -> Result<bool, RuntimeError> {
        if self.support_query_fails {
            return Err(RuntimeError("support query failed".to_string()));
        }
        Ok(self.supported)
    }

    async fn is_feature_supported(&self, feature: XrFeature) -> Result<bool, RuntimeError> {
        if self.failing_feature_queries.contains(&feature) {
            return Err(RuntimeError(format!("{} query failed", feature.as_str())));
        }
        Ok(self.features.contains(&feature))
    }

    async fn request_session(
        &mut self,
        required: &[XrFeature],
        optional: &[XrFeature],
    ) -> Result<(), RuntimeError> {
        self.requests.push((required.to_vec(), optional.to_vec()));
        if let Some(reason) = self.reject_next.take() {
            return Err(RuntimeError(reason));
        }
        if let Some(missing) = required.iter().find(|f| !self.features.contains(*f)) {
            return Err(RuntimeError(format!("required feature {} unavailable", missing.as_str())));
        }
        self.session_open = true;
        Ok(())
    }

    fn bind_render_surface(&mut self) -> Result<(), RuntimeError> {
        if self.surface_fails {
            return Err(RuntimeError("render surface unavailable".to_string()));
        }
        self.surface_bound = true;
        Ok(())
    }

    fn release_render_surface(&mut self) {
        self.surface_bound = false;
    }

    fn subscribe(&mut self, queue: EventQueue) {
        self.queue = Some(queue);
    }

    fn unsubscribe(&mut self) {
        self.queue = None;
    }

    async fn end_session(&mut self) -> Result<(), RuntimeError> {
        self.session_open = false;
        Ok(())
    }
}
