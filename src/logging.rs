use std::sync::Once;

#[allow(unused_imports)]
use log::warn;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                std::panic::set_hook(Box::new(console_error_panic_hook::hook));
                if console_log::init_with_level(log::Level::Warn).is_err() {
                    web_sys::console::warn_1(&"Couldn't initialize logger".into());
                }
            } else {
                // A host application may already own the logger.
                let _ = env_logger::try_init();
            }
        }
    });
}

pub fn printlog(log_str: &str) {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            warn!("{}", log_str);
        } else {
            println!("{}", log_str);
        }
    }
}
