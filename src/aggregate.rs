//! Multi-sample aggregation.
//!
//! A capture burst yields several frames. Face features are averaged per
//! feature before classifying once; eye labels are decided by majority vote.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::eye_features::extract_eye_features;
use crate::eye_shape::{EyeShape, EyeShapeClassifier, EyeShapeResult};
use crate::face_features::{FaceFeatureExtractor, FaceFeatureVector, FACE_FEATURE_COUNT};
use crate::face_shape::{FaceShape, FaceShapeClassifier, FaceShapeResult};
use crate::types::LandmarkSet;

/// Eye vote confidence never exceeds this.
pub const EYE_VOTE_CONFIDENCE_CAP: u32 = 90;

/// What one frame contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub face: Option<FaceFeatureVector>,
    pub eye: Option<EyeShapeResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub face: FaceShapeResult,
    pub eye: Option<EyeShapeResult>,
    /// Frames offered
    pub samples: usize,
    /// Frames that contributed face features
    pub face_samples: usize,
}

impl AggregateResult {
    /// Combined key, when an eye shape was decided.
    pub fn recommendation_key(&self) -> Option<String> {
        self.eye
            .as_ref()
            .map(|eye| recommendation_key(self.face.shape, eye.shape))
    }
}

/// Lookup key for the combined face and eye recommendation, e.g.
/// `ovalado+almendra`.
pub fn recommendation_key(face: FaceShape, eye: EyeShape) -> String {
    format!("{}+{}", face.key(), eye.key())
}

/// Extraction and both classifiers, configured once for a whole burst.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    extractor: FaceFeatureExtractor,
    face: FaceShapeClassifier,
    eye: EyeShapeClassifier,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifiers(face: FaceShapeClassifier, eye: EyeShapeClassifier) -> Self {
        Self {
            extractor: FaceFeatureExtractor::new(),
            face,
            eye,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            extractor: FaceFeatureExtractor::with_config(config.extraction.clone()),
            face: FaceShapeClassifier::with_thresholds(config.face.clone()),
            eye: EyeShapeClassifier::with_thresholds(config.eye.clone()),
        }
    }

    /// Extract what a single frame offers. Eyes are only measured on a
    /// frame whose face is usable.
    pub fn sample(&self, landmarks: &LandmarkSet) -> Sample {
        let face = match self.extractor.extract(landmarks) {
            Ok(features) => features,
            Err(e) => {
                warn!(error = %e, "skipping frame without a usable face");
                return Sample::default();
            }
        };
        let eye = match extract_eye_features(landmarks) {
            Ok(features) => Some(self.eye.classify(&features)),
            Err(e) => {
                warn!(error = %e, "skipping eye features");
                None
            }
        };
        Sample {
            face: Some(face),
            eye,
        }
    }

    pub fn aggregate(&self, samples: &[Sample]) -> Result<AggregateResult> {
        let faces: Vec<FaceFeatureVector> = samples.iter().filter_map(|s| s.face).collect();
        if faces.is_empty() {
            return Err(Error::NoFaceDetected);
        }

        let mean_face = average_features(&faces);
        let face = self.face.classify(&mean_face);
        let eye = vote_eyes(samples);

        debug!(
            samples = samples.len(),
            face_samples = faces.len(),
            face = face.shape.key(),
            eye = ?eye.as_ref().map(|e| e.shape.key()),
            "aggregated"
        );

        Ok(AggregateResult {
            face,
            eye,
            samples: samples.len(),
            face_samples: faces.len(),
        })
    }

    /// Sample every frame, then aggregate.
    pub fn aggregate_landmarks(&self, frames: &[LandmarkSet]) -> Result<AggregateResult> {
        let samples: Vec<Sample> = frames.iter().map(|f| self.sample(f)).collect();
        self.aggregate(&samples)
    }
}

/// Aggregate with default thresholds.
pub fn aggregate_samples(samples: &[Sample]) -> Result<AggregateResult> {
    Aggregator::new().aggregate(samples)
}

/// Per-feature mean over the finite values; neutral where none is finite.
fn average_features(faces: &[FaceFeatureVector]) -> FaceFeatureVector {
    let mut sums = [0.0f32; FACE_FEATURE_COUNT];
    let mut counts = [0usize; FACE_FEATURE_COUNT];
    for face in faces {
        for (i, v) in face.values().into_iter().enumerate() {
            if v.is_finite() {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }

    let mut values = FaceFeatureVector::neutral().values();
    for i in 0..FACE_FEATURE_COUNT {
        if counts[i] > 0 {
            values[i] = sums[i] / counts[i] as f32;
        }
    }
    FaceFeatureVector::from_values(values)
}

/// Majority vote over the eyes of samples with a usable face.
fn vote_eyes(samples: &[Sample]) -> Option<EyeShapeResult> {
    let usable: Vec<&Sample> = samples.iter().filter(|s| s.face.is_some()).collect();

    // Tally in first-seen order so a tie keeps the earliest label
    let mut tally: Vec<(EyeShape, u32)> = Vec::new();
    for eye in usable.iter().filter_map(|s| s.eye.as_ref()) {
        match tally.iter_mut().find(|(shape, _)| *shape == eye.shape) {
            Some((_, votes)) => *votes += 1,
            None => tally.push((eye.shape, 1)),
        }
    }

    let mut winner = *tally.first()?;
    for &entry in &tally[1..] {
        if entry.1 > winner.1 {
            winner = entry;
        }
    }
    let (shape, votes) = winner;

    let latest = usable
        .iter()
        .rev()
        .filter_map(|s| s.eye.as_ref())
        .find(|e| e.shape == shape)?;

    let share = votes as f32 / usable.len() as f32 * 100.0;
    let confidence = (share.round() as u32).min(EYE_VOTE_CONFIDENCE_CAP) as u8;

    Some(EyeShapeResult {
        shape,
        confidence,
        features: latest.features,
        spacing: latest.spacing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eye_features::EyeFeatureVector;
    use crate::eye_shape::EyeSpacing;
    use crate::template::FaceTemplate;
    use crate::types::Point;

    fn eye(shape: EyeShape, ear: f32) -> EyeShapeResult {
        EyeShapeResult {
            shape,
            confidence: 60,
            features: EyeFeatureVector {
                ear,
                ..EyeFeatureVector::default()
            },
            spacing: EyeSpacing::Proportional,
        }
    }

    fn face_sample(f: FaceFeatureVector) -> Sample {
        Sample {
            face: Some(f),
            eye: None,
        }
    }

    #[test]
    fn empty_input_has_no_face() {
        assert!(matches!(aggregate_samples(&[]), Err(Error::NoFaceDetected)));
    }

    #[test]
    fn eye_only_samples_have_no_face() {
        let samples = vec![Sample {
            face: None,
            eye: Some(eye(EyeShape::Almond, 0.28)),
        }];
        assert!(matches!(
            aggregate_samples(&samples),
            Err(Error::NoFaceDetected)
        ));
    }

    #[test]
    fn single_sample_matches_direct_classification() {
        let set = FaceTemplate::builder().build();
        let aggregator = Aggregator::new();
        let sample = aggregator.sample(&set);
        let features = sample.face.unwrap();

        let result = aggregator.aggregate(&[sample]).unwrap();
        assert_eq!(result.face, FaceShapeClassifier::new().classify(&features));
        assert_eq!(result.samples, 1);
        assert_eq!(result.face_samples, 1);
    }

    #[test]
    fn features_are_averaged() {
        let a = FaceFeatureVector {
            width_height_ratio: 0.70,
            jaw_angle: 120.0,
            ..FaceFeatureVector::neutral()
        };
        let b = FaceFeatureVector {
            width_height_ratio: 0.80,
            jaw_angle: 140.0,
            ..FaceFeatureVector::neutral()
        };
        let mean = average_features(&[a, b]);
        assert!((mean.width_height_ratio - 0.75).abs() < 1e-6);
        assert!((mean.jaw_angle - 130.0).abs() < 1e-4);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let a = FaceFeatureVector {
            jaw_angle: f32::NAN,
            chin_angle: f32::INFINITY,
            ..FaceFeatureVector::neutral()
        };
        let b = FaceFeatureVector {
            jaw_angle: 118.0,
            chin_angle: f32::NAN,
            ..FaceFeatureVector::neutral()
        };
        let mean = average_features(&[a, b]);
        assert_eq!(mean.jaw_angle, 118.0);
        // No finite value at all falls back to neutral
        assert_eq!(mean.chin_angle, FaceFeatureVector::neutral().chin_angle);
    }

    #[test]
    fn eye_majority_vote() {
        let base = FaceFeatureVector::neutral();
        let samples = vec![
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Almond, 0.27)),
            },
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Round, 0.36)),
            },
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Almond, 0.29)),
            },
            Sample {
                face: Some(base),
                eye: None,
            },
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Almond, 0.31)),
            },
        ];
        let result = aggregate_samples(&samples).unwrap();
        let eye = result.eye.unwrap();
        assert_eq!(eye.shape, EyeShape::Almond);
        // Three of five frames
        assert_eq!(eye.confidence, 60);
        // Features come from the latest almond frame
        assert_eq!(eye.features.ear, 0.31);
    }

    #[test]
    fn eye_vote_tie_keeps_first_seen() {
        let base = FaceFeatureVector::neutral();
        let samples = vec![
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Hooded, 0.22)),
            },
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Upturned, 0.25)),
            },
        ];
        let eye = aggregate_samples(&samples).unwrap().eye.unwrap();
        assert_eq!(eye.shape, EyeShape::Hooded);
        assert_eq!(eye.confidence, 50);
    }

    #[test]
    fn unanimous_eye_vote_is_capped() {
        let base = FaceFeatureVector::neutral();
        let samples: Vec<Sample> = (0..5)
            .map(|_| Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Almond, 0.28)),
            })
            .collect();
        let eye = aggregate_samples(&samples).unwrap().eye.unwrap();
        assert_eq!(eye.confidence, 90);
    }

    #[test]
    fn no_eye_results_gives_no_eye() {
        let result = aggregate_samples(&[face_sample(FaceFeatureVector::neutral())]).unwrap();
        assert!(result.eye.is_none());
        assert!(result.recommendation_key().is_none());
    }

    #[test]
    fn degenerate_frames_are_left_out() {
        let good = FaceTemplate::builder().build();
        let bad = LandmarkSet::new(vec![good[0]; 478]);
        let aggregator = Aggregator::new();
        assert_eq!(aggregator.sample(&bad), Sample::default());

        let result = aggregator
            .aggregate_landmarks(&[good.clone(), bad, good])
            .unwrap();
        assert_eq!(result.samples, 3);
        assert_eq!(result.face_samples, 2);
        let eye = result.eye.unwrap();
        assert_eq!(eye.shape, EyeShape::Almond);
        // Two of two usable frames, capped
        assert_eq!(eye.confidence, 90);
    }

    #[test]
    fn faceless_frame_casts_no_eye_vote() {
        let bad = LandmarkSet::new(vec![Point::new(0.5, 0.5); 478]);
        let upturned = FaceTemplate::builder()
            .eye_tilt(15.0)
            .eye_aspect(0.25)
            .build();
        let result = Aggregator::new()
            .aggregate_landmarks(&[bad, upturned])
            .unwrap();
        assert_eq!(result.samples, 2);
        assert_eq!(result.face_samples, 1);
        let eye = result.eye.unwrap();
        assert_eq!(eye.shape, EyeShape::Upturned);
        assert_eq!(eye.confidence, 90);
    }

    #[test]
    fn eye_results_without_a_face_are_ignored() {
        let base = FaceFeatureVector::neutral();
        let samples = vec![
            Sample {
                face: None,
                eye: Some(eye(EyeShape::Almond, 0.25)),
            },
            Sample {
                face: None,
                eye: Some(eye(EyeShape::Almond, 0.25)),
            },
            Sample {
                face: Some(base),
                eye: Some(eye(EyeShape::Round, 0.38)),
            },
            Sample {
                face: Some(base),
                eye: None,
            },
        ];
        let eye = aggregate_samples(&samples).unwrap().eye.unwrap();
        assert_eq!(eye.shape, EyeShape::Round);
        // One of two usable frames
        assert_eq!(eye.confidence, 50);
    }

    #[test]
    fn combined_key() {
        assert_eq!(
            recommendation_key(FaceShape::Oval, EyeShape::Almond),
            "ovalado+almendra"
        );
        assert_eq!(
            recommendation_key(FaceShape::Heart, EyeShape::Hooded),
            "corazon+encapotado"
        );
    }
}
