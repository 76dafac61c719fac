use crate::ShareTarget;

pub type Result<T> = std::result::Result<T, ShareError>;

/// Broad classes of failure. None of them are retried by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable.
    Input,
    /// The device cannot serve the request until the user changes something.
    Environment,
    /// The platform accepted the request and then failed it.
    Native,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShareError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{} is not installed", .0.display_name())]
    AppNotInstalled(ShareTarget),

    #[error("Image file does not exist: {0}")]
    FileNotFound(String),

    #[error("File error: {0}")]
    File(String),

    #[error("Could not decode image: {0}")]
    ImageDecode(String),

    #[error("Could not load image at {0}")]
    ImageLoad(String),

    #[error("Could not convert image: {0}")]
    ImageConversion(String),

    #[error("No suitable activity found")]
    ActivityNotFound,

    #[error("Share failed: {0}")]
    ShareFailed(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Photo library permission denied")]
    PermissionDenied,

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Failed to start activity: {0}")]
    StartActivityFailed(String),

    #[error("View error: {0}")]
    View(String),

    #[error("Presentation failed: {0}")]
    PresentationFailed(String),

    #[error("Method {0} is not implemented")]
    NotImplemented(String),
}

impl ShareError {
    /// Wire code handed back to the calling application.
    pub fn code(&self) -> &'static str {
        match self {
            ShareError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            ShareError::AppNotInstalled(target) => target.not_installed_code(),
            ShareError::FileNotFound(_) => "FILE_NOT_FOUND",
            ShareError::File(_) => "FILE_ERROR",
            ShareError::ImageDecode(_) => "IMAGE_ERROR",
            ShareError::ImageLoad(_) => "IMAGE_LOAD_FAILED",
            ShareError::ImageConversion(_) => "IMAGE_CONVERSION_FAILED",
            ShareError::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            ShareError::ShareFailed(_) => "SHARE_FAILED",
            ShareError::SaveFailed(_) => "SAVE_FAILED",
            ShareError::PermissionDenied => "PERMISSION_DENIED",
            ShareError::Url(_) => "URL_ERROR",
            ShareError::StartActivityFailed(_) => "START_ACTIVITY_FAILED",
            ShareError::View(_) => "VIEW_ERROR",
            ShareError::PresentationFailed(_) => "PRESENTATION_FAILED",
            ShareError::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ShareError::InvalidArguments(_)
            | ShareError::FileNotFound(_)
            | ShareError::File(_)
            | ShareError::ImageDecode(_)
            | ShareError::ImageLoad(_)
            | ShareError::NotImplemented(_) => ErrorKind::Input,
            ShareError::AppNotInstalled(_) | ShareError::ActivityNotFound => ErrorKind::Environment,
            _ => ErrorKind::Native,
        }
    }
}

impl From<std::io::Error> for ShareError {
    fn from(err: std::io::Error) -> Self {
        ShareError::File(err.to_string())
    }
}
