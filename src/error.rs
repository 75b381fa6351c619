//! Error kinds reported while loading geometry and textures.
//!
//! None of these are fatal for a [`Model`](crate::data_structures::model::Model):
//! mesh errors are answered with the fallback cube and texture errors leave
//! the model untextured. They are still surfaced as values so that callers
//! using the `try_*` entry points can react to them.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Why a model or texture source could not be read at all.
#[derive(Debug, Error)]
pub enum Unavailable {
    #[error("file doesn't exist")]
    Missing,
    #[error("path is a directory, not a file")]
    Directory,
    #[error("file is empty")]
    Empty,
    #[error("permission denied ({0})")]
    PermissionDenied(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{} is unavailable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: Unavailable },

    #[error("malformed geometry on line {line}: {message}")]
    MalformedGeometry { line: usize, message: String },

    #[error("the source contained no face vertices")]
    EmptyResult,

    #[error("a texture is already assigned to this model")]
    DuplicateTextureAssignment,

    #[error("couldn't decode texture {}: {source}", path.display())]
    TextureDecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl LoadError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl Into<Unavailable>) -> Self {
        LoadError::SourceUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        LoadError::MalformedGeometry {
            line,
            message: message.into(),
        }
    }
}
