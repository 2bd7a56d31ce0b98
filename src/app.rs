use bevy_ecs::prelude::*;
use log::warn;

use crate::components::Transform;
use crate::config::ViewerConfig;
use crate::desktop::OrbitController;
use crate::events::{DeviceEvent, InputEvent};
use crate::frame::{FrameContext, FrameInput};
use crate::geometry::{self, LoadError, LoadOutcome, LoadTicket, ModelLoader, RenderableMesh};
use crate::logging::printlog;
use crate::systems::{new_desktop_schedule, new_frame_schedule, DesktopLabel, FrameLabel};
use crate::xr::{SessionEnd, SessionError, SessionManager, SessionState, XrRuntime};

/// What happened to a finished model load.
#[derive(Debug)]
pub enum ModelStatus {
    Installed,
    /// A newer selection was made while this one was loading.
    Superseded,
    /// Nothing changed; the previous model, if any, stays.
    Failed(LoadError),
}

/// The viewer core: scene state in a `World`, plus the session and the
/// model loader that feed it.
pub struct App<R: XrRuntime> {
    pub world: World,
    session: SessionManager<R>,
    loader: ModelLoader,
}

impl<R: XrRuntime> App<R> {
    pub fn new(runtime: R, config: ViewerConfig) -> Self {
        let mut world = World::default();
        world.init_resource::<Schedules>();

        let mut ctx = FrameContext::default();
        ctx.viewer.desktop_camera = Transform::from_position(config.desktop.camera_position);
        ctx.viewer.desktop_camera.look_at(config.desktop.orbit_target);

        world.insert_resource(OrbitController::new(&config.desktop));
        world.insert_resource(config);
        world.insert_resource(ctx);
        world.insert_resource(FrameInput::default());

        // Events
        world.init_resource::<Events<DeviceEvent>>();
        world.init_resource::<Events<InputEvent>>();

        // Schedules
        let frame_schedule = new_frame_schedule();
        world.add_schedule(frame_schedule.0, frame_schedule.1);
        let desktop_schedule = new_desktop_schedule();
        world.add_schedule(desktop_schedule.0, desktop_schedule.1);

        printlog("viewer core ready");
        Self {
            world,
            session: SessionManager::new(runtime),
            loader: ModelLoader::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        self.world.resource::<ViewerConfig>()
    }

    pub fn context(&self) -> &FrameContext {
        self.world.resource::<FrameContext>()
    }

    pub fn session(&self) -> &SessionManager<R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<R> {
        &mut self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    pub fn orbit_mut(&mut self) -> Mut<'_, OrbitController> {
        self.world.resource_mut::<OrbitController>()
    }

    /// Runs the capability probe. Returns whether the session toggle should
    /// be offered.
    pub async fn probe_capabilities(&mut self) -> bool {
        self.session.probe_capabilities().await.immersive
    }

    /// Session toggle from the UI.
    pub async fn set_immersive(&mut self, enabled: bool) -> Result<(), SessionError> {
        if enabled {
            self.start_session().await
        } else {
            self.stop_session().await;
            Ok(())
        }
    }

    pub async fn start_session(&mut self) -> Result<(), SessionError> {
        let session = self.config().session.clone();
        self.session
            .start(&session.required_features, &session.optional_features)
            .await?;
        let mut ctx = self.world.resource_mut::<FrameContext>();
        ctx.reset_session_state();
        ctx.session = SessionState::Active;
        Ok(())
    }

    pub async fn stop_session(&mut self) -> Option<SessionEnd> {
        let end = self.session.stop().await;
        if end.is_some() {
            self.on_session_ended();
        }
        end
    }

    /// Marks `display_name` as the model to show once its bytes arrive.
    pub fn begin_model_load(&mut self, display_name: &str) -> LoadTicket {
        self.loader.issue(display_name)
    }

    pub fn finish_model_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<RenderableMesh, LoadError>,
    ) -> ModelStatus {
        match self.loader.resolve(ticket, result) {
            LoadOutcome::Ready(mesh) => {
                let anchor = self.config().scene.model_anchor;
                self.world.resource_mut::<FrameContext>().install_mesh(mesh, anchor);
                ModelStatus::Installed
            }
            LoadOutcome::Superseded => ModelStatus::Superseded,
            LoadOutcome::Failed(err) => ModelStatus::Failed(err),
        }
    }

    /// Loads `url` and installs it unless a newer selection arrived meanwhile.
    pub async fn select_model(&mut self, url: &str, display_name: &str) -> ModelStatus {
        let ticket = self.begin_model_load(display_name);
        let target_size = self.config().geometry.target_size;
        let result = geometry::load(url, target_size).await;
        self.finish_model_load(ticket, result)
    }

    /// Drains runtime notifications outside the render loop. Device changes
    /// are buffered for the next immersive frame; a runtime-forced end resets
    /// the scene state. Returns whether a session is still active.
    pub fn poll_session(&mut self) -> bool {
        let (devices, ended) = self.session.pump_events();
        if let Some(SessionEnd::Forced) = ended {
            warn!("session ended by the device");
            self.on_session_ended();
            return false;
        }
        if !self.session.is_active() {
            return false;
        }
        let mut device_events = self.world.resource_mut::<Events<DeviceEvent>>();
        for event in devices {
            device_events.send(event);
        }
        true
    }

    /// One immersive frame. Returns false once no session is active, either
    /// because none was started or because the runtime ended it.
    pub fn xr_frame(&mut self, input: FrameInput) -> bool {
        if !self.poll_session() {
            return false;
        }
        self.world.insert_resource(input);
        self.world.run_schedule(FrameLabel);
        true
    }

    /// One desktop frame. Also picks up a session the runtime ended while no
    /// immersive frames were arriving.
    pub fn desktop_frame(&mut self) {
        self.poll_session();
        self.world.run_schedule(DesktopLabel);
    }

    fn on_session_ended(&mut self) {
        {
            let mut ctx = self.world.resource_mut::<FrameContext>();
            ctx.reset_session_state();
            ctx.session = SessionState::Inactive;
        }
        self.world.insert_resource(FrameInput::default());
        self.world.resource_mut::<Events<DeviceEvent>>().clear();
        self.world.resource_mut::<Events<InputEvent>>().clear();
    }
}
