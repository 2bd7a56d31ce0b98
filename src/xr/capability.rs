use bevy_utils::HashSet;
use log::{info, warn};

use crate::xr::{XrFeature, XrRuntime};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub immersive: bool,
    pub optional_features: HashSet<XrFeature>,
}

impl DeviceCapabilities {
    pub fn supports(&self, feature: XrFeature) -> bool {
        self.optional_features.contains(&feature)
    }
}

/// Queries session and feature support. Every failure degrades to
/// "unsupported" instead of failing the probe.
pub async fn probe<R: XrRuntime>(runtime: &R) -> DeviceCapabilities {
    let immersive = match runtime.is_session_supported().await {
        Ok(supported) => supported,
        Err(err) => {
            warn!("immersive support query failed: {}", err);
            false
        }
    };

    let mut optional_features = HashSet::default();
    if immersive {
        for feature in XrFeature::ALL {
            match runtime.is_feature_supported(feature).await {
                Ok(true) => {
                    optional_features.insert(feature);
                }
                Ok(false) => {}
                Err(err) => warn!("{} support query failed: {}", feature.as_str(), err),
            }
        }
    }

    info!(
        "immersive supported: {}, features: {:?}",
        immersive,
        optional_features.iter().map(|f| f.as_str()).collect::<Vec<_>>()
    );
    DeviceCapabilities {
        immersive,
        optional_features,
    }
}
