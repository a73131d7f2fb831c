use std::path::PathBuf;

/// Convenience result type used across traitstack.
pub type TraitStackResult<T> = Result<T, TraitStackError>;

/// Top-level error taxonomy used by the load/resolve/render/batch APIs.
#[derive(thiserror::Error, Debug)]
pub enum TraitStackError {
    /// The layered source document is missing, unreadable, malformed, or references
    /// undecodable assets.
    #[error("document load error: {0}")]
    DocumentLoad(String),

    /// A name lookup found no matching layer in the searched scope.
    #[error("layer not found: '{name}' in {scope}")]
    LayerNotFound {
        /// Name that was looked up.
        name: String,
        /// Human-readable description of the searched scope.
        scope: String,
    },

    /// The trait manifest is missing, unreadable, or structurally invalid.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Invalid caller-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while flattening or encoding a rendered image.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem failure on a specific path.
    #[error("io error on '{}': {source}", path.display())]
    Io {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TraitStackError {
    /// Build a [`TraitStackError::DocumentLoad`] value.
    pub fn document_load(msg: impl Into<String>) -> Self {
        Self::DocumentLoad(msg.into())
    }

    /// Build a [`TraitStackError::LayerNotFound`] value.
    pub fn layer_not_found(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::LayerNotFound {
            name: name.into(),
            scope: scope.into(),
        }
    }

    /// Build a [`TraitStackError::Manifest`] value.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Build a [`TraitStackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TraitStackError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`TraitStackError::Io`] value for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Return `true` for [`TraitStackError::LayerNotFound`].
    pub fn is_layer_not_found(&self) -> bool {
        matches!(self, Self::LayerNotFound { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
