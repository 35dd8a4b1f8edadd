//! # percent-shape
//!
//! Anthropometric face-shape and eye-shape classification from facial mesh
//! landmarks.
//!
//! This crate provides:
//! - **Face features**: 19 scale-invariant ratios and angles from a
//!   MediaPipe-topology (468/478 point) landmark frame
//! - **Face shape**: oval, round, square, heart, oblong or diamond by weighted
//!   rule scoring, with a confidence and the full score table
//! - **Eye shape**: almond, round, upturned, downturned or hooded, plus an
//!   inter-eye spacing label
//! - **Aggregation**: stable results from a burst of frames
//!
//! The landmark detector itself is not part of this crate; plug one in
//! through [`LandmarkDetector`] and drive it with a [`CaptureSession`].
//!
//! ## Algorithm Overview
//!
//! 1. Measure face height and the forehead, cheekbone and jaw widths, taking
//!    the larger of a fixed landmark pair and a contour scan at that height
//! 2. Normalize every measurement by face height or by another width
//! 3. Add the points of every face rule that holds, then separate commonly
//!    confused pairs
//! 4. Run the eye features through an ordered cascade; the first match wins
//! 5. Over a burst, average face features and vote on eye labels
//!
//! ## Quick Start
//!
//! ```rust
//! use percent_shape::{
//!     classify_eye_shape, classify_face_shape, extract_face_features, recommendation_key,
//!     FaceTemplate,
//! };
//!
//! // Landmarks normally come from a face-mesh model; build a synthetic face here
//! let landmarks = FaceTemplate::builder()
//!     .cheekbone_width(0.74)
//!     .jaw_width(0.58)
//!     .build();
//!
//! let features = extract_face_features(&landmarks).unwrap();
//! let face = classify_face_shape(&features);
//! let eye = classify_eye_shape(&landmarks).unwrap();
//!
//! assert!(face.confidence <= 95);
//! println!("{} ({}%), {} eyes", face.shape, face.confidence, eye.shape);
//! println!("key: {}", recommendation_key(face.shape, eye.shape));
//! ```
//!
//! ## Custom Detectors
//!
//! ```rust
//! use percent_shape::{LandmarkDetector, LandmarkSet, Result};
//!
//! struct MyMesh { /* model handle */ }
//!
//! impl LandmarkDetector for MyMesh {
//!     type Frame = Vec<u8>;
//!
//!     fn load(&mut self) -> Result<()> {
//!         // Load model weights
//!         Ok(())
//!     }
//!
//!     fn detect(&mut self, _frame: &Vec<u8>) -> Result<Option<LandmarkSet>> {
//!         // Run inference, return normalized landmarks of the first face
//!         Ok(None)
//!     }
//! }
//! ```

mod aggregate;
mod capture;
mod config;
mod error;
mod eye_features;
mod eye_shape;
mod face_features;
mod face_shape;
pub mod geometry;
pub mod landmarks;
mod template;
mod types;

pub use aggregate::{
    aggregate_samples, recommendation_key, AggregateResult, Aggregator, Sample,
    EYE_VOTE_CONFIDENCE_CAP,
};
pub use capture::{
    transition, CaptureEvent, CapturePhase, CaptureSession, LandmarkDetector, DEFAULT_BURST_SIZE,
};
pub use config::{ClassifierConfig, ExtractionConfig};
pub use error::{Error, Result};
pub use eye_features::{extract_eye_features, EyeFeatureVector};
pub use eye_shape::{
    classify_eye_shape, EyeShape, EyeShapeClassifier, EyeShapeResult, EyeSpacing, EyeThresholds,
};
pub use face_features::{
    extract_face_features, FaceFeatureExtractor, FaceFeatureVector, FaceMeasurements,
    FACE_FEATURE_COUNT, FACE_FEATURE_NAMES,
};
pub use face_shape::{
    classify_face_shape, FaceShape, FaceShapeClassifier, FaceShapeResult, FaceThresholds,
    ScoreTable, FACE_CONFIDENCE_CAP,
};
pub use template::{FaceTemplate, FaceTemplateBuilder};
pub use types::{LandmarkSet, Point};
