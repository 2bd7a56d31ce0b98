mod loader;
mod mesh;
mod stl;

pub use loader::{load, LoadOutcome, LoadTicket, ModelLoader};
pub use mesh::{MeshVertex, RenderableMesh};
pub use stl::{parse_stl, Triangle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("not a readable STL file: {message}")]
    Parse {
        message: String,
        line: Option<usize>,
    },

    #[error("model contains no usable triangles")]
    EmptyGeometry,
}

impl LoadError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        LoadError::Parse {
            message: message.into(),
            line: None,
        }
    }

    pub(crate) fn parse_at(line: usize, message: impl Into<String>) -> Self {
        LoadError::Parse {
            message: format!("line {}: {}", line, message.into()),
            line: Some(line),
        }
    }
}
