//! Eye feature extraction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::{distance, mean, safe_ratio};
use crate::landmarks::{EyeLandmarks, LEFT_EYE, MIN_LANDMARKS, RIGHT_EYE};
use crate::types::LandmarkSet;

/// Eye aspect ratio used when an eye has no measurable width.
pub const FALLBACK_EAR: f32 = 0.25;
/// Hood score used when the lids are closed.
pub const FALLBACK_HOOD: f32 = 2.0;
/// Spacing ratio used when neither eye has a measurable width.
pub const FALLBACK_SPACING: f32 = 1.0;

/// Eye geometry averaged over both eyes, so mirroring the face leaves it
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeFeatureVector {
    /// Mean lid opening / corner-to-corner width
    pub ear: f32,
    /// Outer-corner elevation in degrees, positive = upturned
    pub corner_angle: f32,
    /// Brow-to-lid distance / lid opening. Low values mean the brow skin
    /// covers the lid crease.
    pub hood_score: f32,
    /// Inner-corner gap / mean eye width
    pub spacing_ratio: f32,
}

impl Default for EyeFeatureVector {
    fn default() -> Self {
        Self {
            ear: FALLBACK_EAR,
            corner_angle: 0.0,
            hood_score: FALLBACK_HOOD,
            spacing_ratio: FALLBACK_SPACING,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SingleEye {
    ear: f32,
    corner_angle: f32,
    hood_score: f32,
    width: f32,
}

fn measure_eye(landmarks: &LandmarkSet, eye: &EyeLandmarks) -> SingleEye {
    let outer = landmarks[eye.outer_corner];
    let inner = landmarks[eye.inner_corner];
    let width = distance(outer, inner);

    let openings: Vec<f32> = eye
        .upper_lid
        .iter()
        .zip(eye.lower_lid.iter())
        .map(|(&u, &l)| distance(landmarks[u], landmarks[l]))
        .collect();
    let ear = safe_ratio(mean(&openings), width, FALLBACK_EAR);

    // Image y grows downward, so a raised outer corner has the smaller y
    let corner_angle = (inner.y - outer.y)
        .atan2((outer.x - inner.x).abs())
        .to_degrees();

    let upper = landmarks[eye.upper_lid[1]];
    let lower = landmarks[eye.lower_lid[1]];
    let hood_score = safe_ratio(
        distance(landmarks[eye.brow_center], upper),
        distance(upper, lower),
        FALLBACK_HOOD,
    );

    SingleEye {
        ear,
        corner_angle: if corner_angle.is_finite() {
            corner_angle
        } else {
            0.0
        },
        hood_score,
        width,
    }
}

/// Extract eye features from one landmark frame.
pub fn extract_eye_features(landmarks: &LandmarkSet) -> Result<EyeFeatureVector> {
    if landmarks.len() < MIN_LANDMARKS {
        return Err(Error::InsufficientLandmarks {
            got: landmarks.len(),
            required: MIN_LANDMARKS,
        });
    }

    let left = measure_eye(landmarks, &LEFT_EYE);
    let right = measure_eye(landmarks, &RIGHT_EYE);
    let gap = distance(
        landmarks[LEFT_EYE.inner_corner],
        landmarks[RIGHT_EYE.inner_corner],
    );

    let features = EyeFeatureVector {
        ear: mean(&[left.ear, right.ear]),
        corner_angle: mean(&[left.corner_angle, right.corner_angle]),
        hood_score: mean(&[left.hood_score, right.hood_score]),
        spacing_ratio: safe_ratio(gap, mean(&[left.width, right.width]), FALLBACK_SPACING),
    };
    debug!(?features, "eye features");
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FaceTemplate;
    use crate::types::Point;

    #[test]
    fn recovers_template_eye_geometry() {
        let set = FaceTemplate::builder()
            .eye_aspect(0.30)
            .eye_tilt(7.0)
            .brow_gap(1.5)
            .eye_spacing(1.1)
            .build();
        let f = extract_eye_features(&set).unwrap();
        assert!((f.ear - 0.30).abs() < 1e-4, "{f:?}");
        assert!((f.corner_angle - 7.0).abs() < 1e-3, "{f:?}");
        assert!((f.hood_score - 1.5).abs() < 1e-3, "{f:?}");
        assert!((f.spacing_ratio - 1.1).abs() < 1e-3, "{f:?}");
    }

    #[test]
    fn drooping_outer_corner_is_negative() {
        let set = FaceTemplate::builder().eye_tilt(-8.0).build();
        let f = extract_eye_features(&set).unwrap();
        assert!((f.corner_angle + 8.0).abs() < 1e-3);
    }

    #[test]
    fn collapsed_eyes_use_fallbacks() {
        let set = LandmarkSet::new(vec![Point::new(0.5, 0.5); 478]);
        let f = extract_eye_features(&set).unwrap();
        assert_eq!(f, EyeFeatureVector::default());
    }

    #[test]
    fn short_set_is_rejected() {
        let set = LandmarkSet::new(vec![Point::new(0.5, 0.5); 467]);
        assert!(matches!(
            extract_eye_features(&set),
            Err(Error::InsufficientLandmarks { got: 467, .. })
        ));
    }

    #[test]
    fn accepts_mesh_without_iris_points() {
        let mut points = FaceTemplate::builder().build().points().to_vec();
        points.truncate(468);
        assert!(extract_eye_features(&LandmarkSet::new(points)).is_ok());
    }
}
