// One error type for the whole pad.
// Every variant states *where* things went wrong.
use thiserror::Error;

use crate::profile::ProfileError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
    #[error("Hand tracker error: {0}")]
    Tracker(String), // Landmark detection failed for a frame (or at startup)
    #[error("Export error: {0}")]
    Export(String), // Flattening/encoding/writing the PNG failed
    #[error("Config error: {0}")]
    Config(String),
    #[error("Caption error: {0}")]
    Caption(String), // Never shown to the user; mapped to a fallback line
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
