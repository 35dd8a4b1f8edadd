use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Degenerate geometry: face height {face_height:.4} is below the minimum {min:.4}")]
    DegenerateGeometry { face_height: f32, min: f32 },

    #[error("Insufficient landmarks: got {got}, need at least {required}")]
    InsufficientLandmarks { got: usize, required: usize },

    #[error("No face detected in any sample")]
    NoFaceDetected,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Landmark detector error: {0}")]
    Detector(String),

    #[error("Illegal capture transition: {event} while {phase}")]
    IllegalTransition {
        phase: &'static str,
        event: &'static str,
    },
}

impl Error {
    /// True for the conditions a caller reports as "no usable face" and
    /// recovers from by asking for a better capture.
    pub fn is_unusable_face(&self) -> bool {
        matches!(
            self,
            Error::DegenerateGeometry { .. } | Error::InsufficientLandmarks { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
