pub mod app;
mod assets;
pub mod components;
pub mod config;
pub mod desktop;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod locomotion;
pub mod logging;
pub mod math;
mod systems;
pub mod xr;

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
mod web;

#[cfg(all(target_arch = "wasm32", web_sys_unstable_apis))]
pub use web::{start_viewer, ViewerHandle};

pub use app::{App, ModelStatus};
pub use config::ViewerConfig;

/// Native preview: loads one model through the headless runtime and
/// reports what would be displayed.
#[cfg(not(target_arch = "wasm32"))]
pub async fn run(model_url: &str) -> anyhow::Result<String> {
    use anyhow::{bail, Context};

    logging::init_logging();
    logging::printlog("running native preview");

    let mut app = App::new(xr::HeadlessRuntime::unsupported(), ViewerConfig::default());
    let immersive = app.probe_capabilities().await;

    match app.select_model(model_url, model_url).await {
        ModelStatus::Installed => {}
        ModelStatus::Failed(err) => {
            return Err(anyhow::Error::new(err).context(format!("could not load model {}", model_url)));
        }
        ModelStatus::Superseded => bail!("load of {} was superseded", model_url),
    }
    app.desktop_frame();

    let model = app
        .context()
        .model
        .as_ref()
        .context("model missing after load")?;
    Ok(format!(
        "{}: {} triangles, scale {:.4}, immersive {}",
        app.loader().display_name().unwrap_or(model_url),
        model.mesh.triangle_count(),
        model.mesh.scale(),
        if immersive { "available" } else { "unavailable" }
    ))
}
