use crate::error::Error;

/// Result type alias used throughout shale.
///
/// All shale operations that can fail return this type.
pub type Result<T> = std::result::Result<T, Error>;
