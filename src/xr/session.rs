use log::{debug, info, warn};
use thiserror::Error;

use crate::events::DeviceEvent;
use crate::xr::{probe, DeviceCapabilities, EventQueue, RuntimeError, RuntimeEvent, XrFeature, XrRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Starting,
    Active,
    Ending,
}

/// Why an active session went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Requested,
    Forced,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("immersive sessions are not available on this device")]
    Unavailable,

    #[error("session already active")]
    AlreadyActive,

    #[error("a session transition is already in progress")]
    Pending,

    #[error("could not enter immersive mode: {0}")]
    StartFailed(#[source] RuntimeError),
}

/// Owns the single immersive session and its runtime subscription.
pub struct SessionManager<R: XrRuntime> {
    runtime: R,
    state: SessionState,
    capabilities: Option<DeviceCapabilities>,
    queue: EventQueue,
    subscribed: bool,
}

impl<R: XrRuntime> SessionManager<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            state: SessionState::Inactive,
            capabilities: None,
            queue: EventQueue::new(),
            subscribed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// Probes once; later calls return the cached result.
    pub async fn probe_capabilities(&mut self) -> &DeviceCapabilities {
        if self.capabilities.is_none() {
            self.capabilities = Some(probe(&self.runtime).await);
        }
        self.capabilities.get_or_insert_with(DeviceCapabilities::default)
    }

    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    pub fn is_immersive_supported(&self) -> bool {
        self.capabilities.as_ref().map_or(false, |c| c.immersive)
    }

    pub async fn start(
        &mut self,
        required: &[XrFeature],
        optional: &[XrFeature],
    ) -> Result<(), SessionError> {
        match self.state {
            SessionState::Inactive => {}
            SessionState::Active => return Err(SessionError::AlreadyActive),
            SessionState::Starting | SessionState::Ending => return Err(SessionError::Pending),
        }
        if !self.is_immersive_supported() {
            return Err(SessionError::Unavailable);
        }

        self.state = SessionState::Starting;
        info!("starting immersive session");

        if let Err(err) = self.runtime.request_session(required, optional).await {
            warn!("session request rejected: {}", err);
            self.state = SessionState::Inactive;
            return Err(SessionError::StartFailed(err));
        }

        if let Err(err) = self.runtime.bind_render_surface() {
            warn!("could not bind render surface: {}", err);
            if let Err(end_err) = self.runtime.end_session().await {
                debug!("ending half-started session failed: {}", end_err);
            }
            self.state = SessionState::Inactive;
            return Err(SessionError::StartFailed(err));
        }

        // Anything left over belongs to an earlier session.
        self.queue.drain();
        self.runtime.subscribe(self.queue.clone());
        self.subscribed = true;
        self.state = SessionState::Active;
        info!("immersive session active");
        Ok(())
    }

    /// Ends the session. A no-op while inactive; returns the end reason when a
    /// session was actually torn down.
    pub async fn stop(&mut self) -> Option<SessionEnd> {
        match self.state {
            SessionState::Inactive | SessionState::Ending => return None,
            SessionState::Starting | SessionState::Active => {}
        }
        self.state = SessionState::Ending;
        self.teardown();
        if let Err(err) = self.runtime.end_session().await {
            // The session is gone from our side either way.
            warn!("runtime failed to end session cleanly: {}", err);
        }
        self.state = SessionState::Inactive;
        info!("immersive session ended");
        Some(SessionEnd::Requested)
    }

    /// Drains runtime notifications. Device changes are returned in arrival
    /// order; an unsolicited end tears the session down.
    pub fn pump_events(&mut self) -> (Vec<DeviceEvent>, Option<SessionEnd>) {
        let mut devices = Vec::new();
        let mut ended = None;
        for event in self.queue.drain() {
            match event {
                RuntimeEvent::Device(device) if ended.is_none() => devices.push(device),
                RuntimeEvent::Device(_) => {}
                RuntimeEvent::SessionEnded => {
                    if self.state == SessionState::Active {
                        self.state = SessionState::Ending;
                        self.teardown();
                        self.state = SessionState::Inactive;
                        info!("immersive session ended by the runtime");
                        ended = Some(SessionEnd::Forced);
                    }
                }
            }
        }
        (devices, ended)
    }

    fn teardown(&mut self) {
        if self.subscribed {
            self.runtime.unsubscribe();
            self.subscribed = false;
        }
        self.runtime.release_render_surface();
        self.queue.drain();
    }
}
