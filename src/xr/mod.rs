mod capability;
mod headless;
mod runtime;
mod session;

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
mod webxr;

pub use capability::{probe, DeviceCapabilities};
pub use headless::HeadlessRuntime;
pub use runtime::{EventQueue, RuntimeError, RuntimeEvent, XrRuntime};
pub use session::{SessionEnd, SessionError, SessionManager, SessionState};

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
pub use webxr::{start_frame_loop, WebXrRuntime};

/// Session features that can be requested from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XrFeature {
    LocalFloor,
    BoundedFloor,
    HandTracking,
}

impl XrFeature {
    pub const ALL: [XrFeature; 3] = [
        XrFeature::LocalFloor,
        XrFeature::BoundedFloor,
        XrFeature::HandTracking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            XrFeature::LocalFloor => "local-floor",
            XrFeature::BoundedFloor => "bounded-floor",
            XrFeature::HandTracking => "hand-tracking",
        }
    }
}
