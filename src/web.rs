//! JavaScript entry points for the page hosting the viewer.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

use crate::app::{App, ModelStatus};
use crate::config::ViewerConfig;
use crate::geometry::{self, LoadError, LoadTicket, RenderableMesh};
use crate::logging::{init_logging, printlog};
use crate::xr::{start_frame_loop, WebXrRuntime};

type Viewer = Rc<RefCell<App<WebXrRuntime>>>;

/// Work that arrived while the viewer was borrowed elsewhere, such as during
/// a session toggle. Applied on the next frame the viewer is free.
#[derive(Default)]
struct Deferred {
    selections: Vec<(String, String)>,
    loads: Vec<(LoadTicket, Result<RenderableMesh, LoadError>)>,
}

type SharedDeferred = Rc<RefCell<Deferred>>;

fn report(status: ModelStatus) {
    match status {
        ModelStatus::Installed => info!("model installed"),
        ModelStatus::Superseded => {}
        ModelStatus::Failed(err) => error!("could not load model: {}", err),
    }
}

fn spawn_load(viewer: Viewer, deferred: SharedDeferred, ticket: LoadTicket, url: String, target_size: f32) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = geometry::load(&url, target_size).await;
        match viewer.try_borrow_mut() {
            Ok(mut app) => report(app.finish_model_load(ticket, result)),
            Err(_) => deferred.borrow_mut().loads.push((ticket, result)),
        };
    });
}

/// Issues tickets for queued selections, then resolves queued loads. Every
/// queued load is older than every queued selection, so it comes out
/// superseded whenever a selection was waiting.
fn drain_deferred(app: &mut App<WebXrRuntime>, viewer: &Viewer, deferred: &SharedDeferred) {
    let (selections, loads) = {
        let mut pending = deferred.borrow_mut();
        (std::mem::take(&mut pending.selections), std::mem::take(&mut pending.loads))
    };
    let target_size = app.config().geometry.target_size;
    for (url, display_name) in selections {
        let ticket = app.begin_model_load(&display_name);
        spawn_load(viewer.clone(), deferred.clone(), ticket, url, target_size);
    }
    for (ticket, result) in loads {
        report(app.finish_model_load(ticket, result));
    }
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

#[wasm_bindgen]
pub struct ViewerHandle {
    app: Viewer,
    deferred: SharedDeferred,
}

#[wasm_bindgen]
impl ViewerHandle {
    /// Whether to show the session toggle.
    pub fn immersive_supported(&self) -> bool {
        self.app.borrow().session().is_immersive_supported()
    }

    /// Model selection from the catalog or a file picker. While the viewer is
    /// busy the selection is queued and starts on the next free frame.
    pub fn select_model(&self, url: String, display_name: String) {
        let Ok(mut app) = self.app.try_borrow_mut() else {
            debug!("viewer busy, queueing selection of {}", display_name);
            self.deferred.borrow_mut().selections.push((url, display_name));
            return;
        };
        drain_deferred(&mut app, &self.app, &self.deferred);
        let ticket = app.begin_model_load(&display_name);
        let target_size = app.config().geometry.target_size;
        spawn_load(self.app.clone(), self.deferred.clone(), ticket, url, target_size);
    }

    /// Session toggle. Resolves to whether a session is active afterwards.
    pub fn set_immersive(&self, enabled: bool) -> js_sys::Promise {
        let app = self.app.clone();
        let deferred = self.deferred.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let active = {
                let mut viewer = app
                    .try_borrow_mut()
                    .map_err(|_| JsValue::from_str("a session change is already in progress"))?;
                viewer
                    .set_immersive(enabled)
                    .await
                    .map_err(|e| to_js(anyhow!("could not enter immersive mode: {}", e)))?;
                viewer.session().is_active()
            };
            if enabled && active {
                let handle = app.clone();
                start_frame_loop(app, move |viewer| drain_deferred(viewer, &handle, &deferred))?;
            }
            Ok(JsValue::from_bool(active))
        })
    }

    /// Browser mouse button index: 0 left, 1 middle, 2 right.
    pub fn pointer_button(&self, button: u16, pressed: bool) {
        let button = match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            other => MouseButton::Other(other),
        };
        let state = if pressed { ElementState::Pressed } else { ElementState::Released };
        if let Ok(mut app) = self.app.try_borrow_mut() {
            app.orbit_mut().process_button(button, state);
        }
    }

    pub fn pointer_move(&self, dx: f64, dy: f64) {
        if let Ok(mut app) = self.app.try_borrow_mut() {
            app.orbit_mut().process_mouse(dx, dy);
        }
    }

    /// Wheel movement in lines; positive scrolls toward the user.
    pub fn wheel(&self, lines: f32) {
        if let Ok(mut app) = self.app.try_borrow_mut() {
            app.orbit_mut().process_scroll(&MouseScrollDelta::LineDelta(0.0, -lines));
        }
    }
}

fn start_desktop_loop(app: Viewer, deferred: SharedDeferred) -> anyhow::Result<()> {
    let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;

    let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    let frame_window = window.clone();

    *g.borrow_mut() = Some(Closure::new(move || {
        if let Ok(mut viewer) = app.try_borrow_mut() {
            drain_deferred(&mut viewer, &app, &deferred);
            viewer.desktop_frame();
        }
        if let Some(callback) = f.borrow().as_ref() {
            if frame_window
                .request_animation_frame(callback.as_ref().unchecked_ref())
                .is_err()
            {
                error!("could not schedule desktop frame");
            }
        }
    }));

    let callback = g.borrow();
    let callback = callback.as_ref().ok_or_else(|| anyhow!("desktop frame callback missing"))?;
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|e| anyhow!("requestAnimationFrame failed: {:?}", e))?;
    Ok(())
}

async fn setup(canvas_id: &str) -> anyhow::Result<ViewerHandle> {
    let mut app = App::new(WebXrRuntime::new(canvas_id), ViewerConfig::default());
    let immersive = app.probe_capabilities().await;
    printlog(&format!("immersive mode {}", if immersive { "available" } else { "unavailable" }));

    let handle = ViewerHandle {
        app: Rc::new(RefCell::new(app)),
        deferred: Rc::new(RefCell::new(Deferred::default())),
    };
    start_desktop_loop(handle.app.clone(), handle.deferred.clone())?;
    Ok(handle)
}

#[wasm_bindgen]
pub async fn start_viewer(canvas_id: String) -> Result<ViewerHandle, JsValue> {
    init_logging();
    printlog("starting viewer");
    setup(&canvas_id).await.map_err(to_js)
}
