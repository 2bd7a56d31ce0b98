use log::{info, warn};
use web_time::Instant;

use crate::assets::load_binary;
use crate::geometry::{parse_stl, LoadError, RenderableMesh};

/// Fetches, parses and normalizes the model at `url`.
pub async fn load(url: &str, target_size: f32) -> Result<RenderableMesh, LoadError> {
    let started = Instant::now();
    let bytes = load_binary(url).await?;
    let triangles = parse_stl(&bytes)?;
    let mesh = RenderableMesh::from_triangles(&triangles, target_size)?;
    info!(
        "loaded {}: {} triangles, extent {:?}, scale {} ({:?})",
        url,
        mesh.triangle_count(),
        mesh.source_extent(),
        mesh.scale(),
        started.elapsed()
    );
    Ok(mesh)
}

/// Identifies one issued load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug)]
pub enum LoadOutcome {
    /// The mesh is ready to be installed in the model slot.
    Ready(RenderableMesh),
    /// A newer request was issued; the result was dropped.
    Superseded,
    /// The latest request failed; the current model stays.
    Failed(LoadError),
}

/// Orders concurrent model loads so only the latest request is applied.
#[derive(Debug, Default)]
pub struct ModelLoader {
    latest: u64,
    display_name: Option<String>,
    pending_name: Option<String>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, display_name: &str) -> LoadTicket {
        self.latest += 1;
        self.pending_name = Some(display_name.to_string());
        LoadTicket(self.latest)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    pub fn is_pending(&self) -> bool {
        self.pending_name.is_some()
    }

    /// Name of the model currently installed.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn resolve(
        &mut self,
        ticket: LoadTicket,
        result: Result<RenderableMesh, LoadError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            log::debug!("discarding superseded load {:?}", ticket);
            return LoadOutcome::Superseded;
        }
        let name = self.pending_name.take();
        match result {
            Ok(mesh) => {
                self.display_name = name;
                LoadOutcome::Ready(mesh)
            }
            Err(err) => {
                warn!("could not load model {}: {}", name.as_deref().unwrap_or("?"), err);
                LoadOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Triangle;
    use crate::math::Vec3f;

    fn mesh() -> RenderableMesh {
        let t = Triangle {
            normal: Vec3f::zeros(),
            vertices: [Vec3f::zeros(), Vec3f::x(), Vec3f::y()],
        };
        RenderableMesh::from_triangles(&[t], 2.0).unwrap()
    }

    #[test]
    fn later_request_supersedes_earlier_regardless_of_completion_order() {
        let mut loader = ModelLoader::new();
        let a = loader.issue("a");
        let b = loader.issue("b");

        assert!(matches!(loader.resolve(b, Ok(mesh())), LoadOutcome::Ready(_)));
        assert!(matches!(loader.resolve(a, Ok(mesh())), LoadOutcome::Superseded));
        assert_eq!(loader.display_name(), Some("b"));
    }

    #[test]
    fn stale_failure_is_silent() {
        let mut loader = ModelLoader::new();
        let a = loader.issue("a");
        let _b = loader.issue("b");
        assert!(matches!(
            loader.resolve(a, Err(LoadError::EmptyGeometry)),
            LoadOutcome::Superseded
        ));
        assert!(loader.is_pending());
    }

    #[test]
    fn failure_keeps_previous_name() {
        let mut loader = ModelLoader::new();
        let a = loader.issue("a");
        loader.resolve(a, Ok(mesh()));
        let b = loader.issue("b");
        assert!(matches!(
            loader.resolve(b, Err(LoadError::parse("bad"))),
            LoadOutcome::Failed(_)
        ));
        assert_eq!(loader.display_name(), Some("a"));
        assert!(!loader.is_pending());
    }

    #[test]
    fn loads_binary_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.stl");
        let bytes = crate::geometry::stl::tests::binary_stl(&[
            [[0.0, 0.0, 0.0], [40.0, 0.0, 0.0], [0.0, 10.0, 0.0]],
            [[0.0, 0.0, 5.0], [40.0, 0.0, 5.0], [0.0, 10.0, 5.0]],
        ]);
        std::fs::write(&path, bytes).unwrap();

        let mesh = pollster::block_on(load(path.to_str().unwrap(), 2.0)).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!((mesh.scale() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.stl");
        let result = pollster::block_on(load(path.to_str().unwrap(), 2.0));
        assert!(matches!(result, Err(LoadError::Fetch { .. })));
    }
}
