use cfg_if::cfg_if;

use crate::geometry::LoadError;

#[cfg(target_arch = "wasm32")]
fn format_url(url: &str) -> Result<reqwest::Url, LoadError> {
    let fetch_error = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };
    let origin = web_sys::window()
        .ok_or_else(|| fetch_error("no window".to_string()))?
        .location()
        .origin()
        .map_err(|_| fetch_error("page origin unavailable".to_string()))?;
    let base = reqwest::Url::parse(&format!("{}/", origin)).map_err(|e| fetch_error(e.to_string()))?;
    // Absolute urls replace the base entirely.
    base.join(url).map_err(|e| fetch_error(e.to_string()))
}

/// Reads the raw bytes of a model. On the web `url` is fetched relative to the
/// page origin; natively it is a filesystem path or a `file://` url.
pub async fn load_binary(url: &str) -> Result<Vec<u8>, LoadError> {
    let fetch_error = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };

    cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            let resolved = format_url(url)?;
            let response = reqwest::get(resolved)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| fetch_error(e.to_string()))?;
            let data = response
                .bytes()
                .await
                .map_err(|e| fetch_error(e.to_string()))?
                .to_vec();
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            let data = std::fs::read(path).map_err(|e| fetch_error(e.to_string()))?;
        }
    }

    log::debug!("fetched {} bytes from {}", data.len(), url);
    Ok(data)
}
