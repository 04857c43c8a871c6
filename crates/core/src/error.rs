use std::path::PathBuf;

use parlor_backend::BackendError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ControllerError {
    #[snafu(display("{action} failed: {source}"))]
    Backend {
        stage: &'static str,
        action: &'static str,
        source: BackendError,
    },
    #[snafu(display("failed to read image {path:?}: {source}"))]
    ReadImage {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{path:?} is not a supported image (png, jpg, jpeg or gif)"))]
    UnsupportedImage { stage: &'static str, path: PathBuf },
}

impl ControllerError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Backend { stage, .. }
            | Self::ReadImage { stage, .. }
            | Self::UnsupportedImage { stage, .. } => stage,
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
