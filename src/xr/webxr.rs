//! Browser WebXR runtime and the immersive frame loop.

#[allow(unused_imports)]
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::*;

use crate::app::App;
use crate::events::DeviceEvent;
use crate::frame::FrameInput;
use crate::input::{ControllerReport, DeviceKind, DeviceReport, HandReport, InputSlot};
use crate::logging::printlog;
use crate::math::{Pose, Quat, UnitQuat, Vec2f, Vec3f};
use crate::xr::{EventQueue, RuntimeError, RuntimeEvent, XrFeature, XrRuntime};

fn request_animation_frame(session: &XrSession, f: &Closure<dyn FnMut(f64, XrFrame)>) -> u32 {
    session.request_animation_frame(f.as_ref().unchecked_ref())
}

fn js_error(context: &str, err: JsValue) -> RuntimeError {
    RuntimeError(format!("{}: {:?}", context, err))
}

fn js_array(values: &[&str]) -> JsValue {
    JsValue::from(
        values
            .iter()
            .map(|x| JsValue::from_str(x))
            .collect::<js_sys::Array>(),
    )
}

fn feature_names(features: &[XrFeature]) -> Vec<&'static str> {
    features.iter().map(|f| f.as_str()).collect()
}

fn to_pose(transform: &XrRigidTransform) -> Pose {
    let p = transform.position();
    let r = transform.orientation();
    let rotation = Quat::new(r.w() as f32, r.x() as f32, r.y() as f32, r.z() as f32);
    Pose::new(
        Vec3f::new(p.x() as f32, p.y() as f32, p.z() as f32),
        UnitQuat::new_normalize(rotation),
    )
}

/// Left hand drives locomotion; anything not right-handed takes the
/// primary slot.
fn slot_for(source: &XrInputSource) -> InputSlot {
    match source.handedness() {
        XrHandedness::Right => InputSlot::Secondary,
        _ => InputSlot::Primary,
    }
}

fn kind_of(source: &XrInputSource) -> DeviceKind {
    if source.hand().is_some() {
        DeviceKind::Hand
    } else {
        DeviceKind::Controller
    }
}

fn create_webgl_context(canvas_id: &str) -> Result<WebGl2RenderingContext, JsValue> {
    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(canvas_id))
        .ok_or_else(|| JsValue::from_str("canvas not found"))?
        .dyn_into::<HtmlCanvasElement>()?;

    let gl_attribs = Object::new();
    Reflect::set(&gl_attribs, &JsValue::from_str("xrCompatible"), &JsValue::TRUE)?;
    canvas
        .get_context_with_context_options("webgl2", &gl_attribs)?
        .ok_or_else(|| JsValue::from_str("webgl2 unavailable"))?
        .dyn_into()
        .map_err(JsValue::from)
}

fn xr_system() -> Option<XrSystem> {
    let navigator = web_sys::window()?.navigator();
    // navigator.xr is missing entirely on browsers without WebXR.
    if !Reflect::has(&navigator, &JsValue::from_str("xr")).unwrap_or(false) {
        return None;
    }
    Some(navigator.xr())
}

/// `isSessionSupported` with the feature as a requirement. Runtimes that
/// ignore the second argument answer for the plain session mode.
async fn session_supported_with(xr: &XrSystem, feature: XrFeature) -> Result<bool, JsValue> {
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("requiredFeatures"), &js_array(&[feature.as_str()]))?;
    let query: js_sys::Function = Reflect::get(xr, &JsValue::from_str("isSessionSupported"))?.dyn_into()?;
    let promise: js_sys::Promise = query
        .call2(xr, &JsValue::from_str("immersive-vr"), &options)?
        .dyn_into()?;
    Ok(JsFuture::from(promise).await?.as_bool().unwrap_or(false))
}

fn window_has(name: &str) -> bool {
    web_sys::window()
        .map(|w| Reflect::has(&w, &JsValue::from_str(name)).unwrap_or(false))
        .unwrap_or(false)
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64, XrFrame)>>>>;

pub struct WebXrRuntime {
    canvas_id: String,
    gl: Option<WebGl2RenderingContext>,
    session: Option<XrSession>,
    ref_space: Option<XrReferenceSpace>,
    on_sources_change: Option<Closure<dyn FnMut(XrInputSourcesChangeEvent)>>,
    on_end: Option<Closure<dyn FnMut(XrSessionEvent)>>,
    frame_loop: Option<FrameCallback>,
}

impl WebXrRuntime {
    pub fn new(canvas_id: &str) -> Self {
        Self {
            canvas_id: canvas_id.to_string(),
            gl: None,
            session: None,
            ref_space: None,
            on_sources_change: None,
            on_end: None,
            frame_loop: None,
        }
    }

    pub fn session(&self) -> Option<&XrSession> {
        self.session.as_ref()
    }

    /// Samples head and input-source state for one frame.
    pub fn read_frame(&self, frame: &XrFrame) -> FrameInput {
        let mut input = FrameInput::default();
        let (Some(session), Some(ref_space)) = (&self.session, &self.ref_space) else {
            return input;
        };

        input.head = frame
            .get_viewer_pose(ref_space)
            .map(|viewer| to_pose(&viewer.transform()));

        let sources = session.input_sources();
        for i in 0..sources.length() {
            let Some(source) = sources.get(i) else {
                continue;
            };
            let slot = slot_for(&source);
            if input.devices[slot.index()].is_some() {
                continue;
            }
            let Some(pose) = frame.get_pose(&source.target_ray_space(), ref_space) else {
                continue;
            };
            let pose = to_pose(&pose.transform());

            let report = match source.hand() {
                Some(hand) => read_hand(frame, &hand, ref_space, pose),
                None => Some(read_controller(&source, pose)),
            };
            input.devices[slot.index()] = report;
        }
        input
    }
}

fn read_controller(source: &XrInputSource, pose: Pose) -> DeviceReport {
    let (thumbstick, trigger_pressed) = match source.gamepad() {
        Some(gamepad) => {
            let axes = gamepad.axes();
            // xr-standard mapping: thumbstick on axes 2 and 3, trigger on button 0.
            let axis = |i: u32| axes.get(i).as_f64().unwrap_or(0.0) as f32;
            let trigger = gamepad
                .buttons()
                .get(0)
                .dyn_into::<GamepadButton>()
                .map(|b| b.pressed())
                .unwrap_or(false);
            (Vec2f::new(axis(2), axis(3)), trigger)
        }
        None => (Vec2f::zeros(), false),
    };
    DeviceReport::Controller(ControllerReport {
        pose,
        thumbstick,
        trigger_pressed,
    })
}

fn read_hand(frame: &XrFrame, hand: &XrHand, ref_space: &XrReferenceSpace, pose: Pose) -> Option<DeviceReport> {
    let joint = |j: XrHandJoint| {
        frame
            .get_joint_pose(&hand.get(j), ref_space)
            .map(|p| to_pose(&p.transform()).position)
    };
    Some(DeviceReport::Hand(HandReport {
        pose,
        thumb_tip: joint(XrHandJoint::ThumbTip)?,
        index_tip: joint(XrHandJoint::IndexFingerTip)?,
    }))
}

impl XrRuntime for WebXrRuntime {
    async fn is_session_supported(&self) -> Result<bool, RuntimeError> {
        let Some(xr) = xr_system() else {
            return Ok(false);
        };
        let supported = JsFuture::from(xr.is_session_supported(XrSessionMode::ImmersiveVr))
            .await
            .map_err(|e| js_error("isSessionSupported", e))?;
        Ok(supported.as_bool().unwrap_or(false))
    }

    async fn is_feature_supported(&self, feature: XrFeature) -> Result<bool, RuntimeError> {
        let Some(xr) = xr_system() else {
            return Ok(false);
        };
        let interface = match feature {
            XrFeature::LocalFloor => None,
            XrFeature::BoundedFloor => Some("XRBoundedReferenceSpace"),
            XrFeature::HandTracking => Some("XRHand"),
        };
        if interface.map_or(false, |name| !window_has(name)) {
            return Ok(false);
        }
        session_supported_with(&xr, feature)
            .await
            .map_err(|e| js_error(feature.as_str(), e))
    }

    async fn request_session(
        &mut self,
        required: &[XrFeature],
        optional: &[XrFeature],
    ) -> Result<(), RuntimeError> {
        let xr = xr_system().ok_or_else(|| RuntimeError("WebXR unavailable".to_string()))?;

        let mut session_init = XrSessionInit::new();
        session_init.required_features(&js_array(&feature_names(required)));
        session_init.optional_features(&js_array(&feature_names(optional)));
        let session: XrSession =
            JsFuture::from(xr.request_session_with_options(XrSessionMode::ImmersiveVr, &session_init))
                .await
                .map_err(|e| js_error("requestSession", e))?
                .into();

        let ref_space = match JsFuture::from(session.request_reference_space(XrReferenceSpaceType::LocalFloor)).await {
            Ok(space) => space.into(),
            Err(err) => {
                let _ = session.end();
                return Err(js_error("requestReferenceSpace", err));
            }
        };

        printlog("XR session granted");
        self.session = Some(session);
        self.ref_space = Some(ref_space);
        Ok(())
    }

    fn bind_render_surface(&mut self) -> Result<(), RuntimeError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| RuntimeError("no session to bind".to_string()))?;
        if self.gl.is_none() {
            self.gl = Some(create_webgl_context(&self.canvas_id).map_err(|e| js_error("webgl2", e))?);
        }
        let gl = self.gl.as_ref().ok_or_else(|| RuntimeError("webgl2 unavailable".to_string()))?;

        let xr_gl_layer = XrWebGlLayer::new_with_web_gl2_rendering_context(session, gl)
            .map_err(|e| js_error("XRWebGLLayer", e))?;
        let mut render_state_init = XrRenderStateInit::new();
        render_state_init.base_layer(Some(&xr_gl_layer));
        session.update_render_state_with_state(&render_state_init);
        Ok(())
    }

    fn release_render_surface(&mut self) {
        if let Some(session) = &self.session {
            let mut render_state_init = XrRenderStateInit::new();
            render_state_init.base_layer(None);
            session.update_render_state_with_state(&render_state_init);
        }
    }

    fn subscribe(&mut self, queue: EventQueue) {
        let Some(session) = &self.session else {
            return;
        };

        // Sources present before we listened.
        let current = session.input_sources();
        for i in 0..current.length() {
            if let Some(source) = current.get(i) {
                queue.push(RuntimeEvent::Device(DeviceEvent::Connected {
                    slot: slot_for(&source),
                    kind: kind_of(&source),
                }));
            }
        }

        let changes = queue.clone();
        let on_sources_change = Closure::<dyn FnMut(XrInputSourcesChangeEvent)>::new(
            move |event: XrInputSourcesChangeEvent| {
                for removed in event.removed().iter() {
                    let source: XrInputSource = removed.unchecked_into();
                    changes.push(RuntimeEvent::Device(DeviceEvent::Disconnected { slot: slot_for(&source) }));
                }
                for added in event.added().iter() {
                    let source: XrInputSource = added.unchecked_into();
                    changes.push(RuntimeEvent::Device(DeviceEvent::Connected {
                        slot: slot_for(&source),
                        kind: kind_of(&source),
                    }));
                }
            },
        );
        session.set_oninputsourceschange(Some(on_sources_change.as_ref().unchecked_ref()));

        let ends = queue;
        let on_end = Closure::<dyn FnMut(XrSessionEvent)>::new(move |_: XrSessionEvent| {
            ends.push(RuntimeEvent::SessionEnded);
        });
        session.set_onend(Some(on_end.as_ref().unchecked_ref()));

        self.on_sources_change = Some(on_sources_change);
        self.on_end = Some(on_end);
    }

    fn unsubscribe(&mut self) {
        if let Some(session) = &self.session {
            session.set_oninputsourceschange(None);
            session.set_onend(None);
        }
        self.on_sources_change = None;
        self.on_end = None;
        // A session that ended never delivers another frame, so the loop
        // callback would otherwise live on.
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.borrow_mut().take();
        }
    }

    async fn end_session(&mut self) -> Result<(), RuntimeError> {
        self.ref_space = None;
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        JsFuture::from(session.end())
            .await
            .map_err(|e| js_error("session.end", e))?;
        Ok(())
    }
}

/// Drives `App::xr_frame` from the session's animation frames until the
/// session ends. `before_frame` runs first on every frame the app is free.
pub fn start_frame_loop<F>(app: Rc<RefCell<App<WebXrRuntime>>>, mut before_frame: F) -> Result<(), JsValue>
where
    F: FnMut(&mut App<WebXrRuntime>) + 'static,
{
    let session = app
        .borrow()
        .session()
        .runtime()
        .session()
        .cloned()
        .ok_or_else(|| JsValue::from_str("no active XR session"))?;

    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    let loop_app = app.clone();

    *g.borrow_mut() = Some(Closure::new(move |_time: f64, frame: XrFrame| {
        let sess: XrSession = frame.session();
        let keep_running = match loop_app.try_borrow_mut() {
            Ok(mut app) => {
                before_frame(&mut app);
                let input = app.session().runtime().read_frame(&frame);
                app.xr_frame(input)
            }
            Err(_) => {
                // A session toggle is in flight.
                debug!("viewer busy, skipping XR frame");
                true
            }
        };
        if !keep_running {
            info!("XR frame loop stopped");
            f.borrow_mut().take();
            return;
        }
        if let Some(callback) = f.borrow().as_ref() {
            request_animation_frame(&sess, callback);
        }
    }));

    if let Some(callback) = g.borrow().as_ref() {
        request_animation_frame(&session, callback);
    }
    app.borrow_mut().session_mut().runtime_mut().frame_loop = Some(g);
    Ok(())
}
