use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or validating a mesh
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("cannot read mesh file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed mesh at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unsupported mesh format version {0}")]
    UnsupportedVersion(String),
    #[error("unsupported element type {element_type} (element {element_id})")]
    UnsupportedElement { element_type: i32, element_id: usize },
    #[error("element references unknown node {node}")]
    UnknownNode { node: usize },
    #[error("boundary face {face:?} with marker {marker} has no owning tetrahedron")]
    OrphanFace { face: [usize; 3], marker: i32 },
    #[error("mesh contains no tetrahedra")]
    NoVolumeElements,
}

impl MeshError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        MeshError::Parse {
            line,
            message: message.into(),
        }
    }
}
