//! Eye shape classification.
//!
//! An ordered cascade: the first class whose condition holds wins, so the
//! classes are mutually exclusive by construction. Spacing is an independent
//! label on the same features.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::eye_features::{extract_eye_features, EyeFeatureVector};
use crate::types::LandmarkSet;

/// Eye shape categories, serialized with the recommendation-table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EyeShape {
    #[serde(rename = "almendra")]
    Almond,
    #[serde(rename = "redondo")]
    Round,
    #[serde(rename = "rasgado")]
    Upturned,
    #[serde(rename = "caido")]
    Downturned,
    #[serde(rename = "encapotado")]
    Hooded,
}

impl EyeShape {
    pub const ALL: [EyeShape; 5] = [
        EyeShape::Almond,
        EyeShape::Round,
        EyeShape::Upturned,
        EyeShape::Downturned,
        EyeShape::Hooded,
    ];

    /// Recommendation-table key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Almond => "almendra",
            Self::Round => "redondo",
            Self::Upturned => "rasgado",
            Self::Downturned => "caido",
            Self::Hooded => "encapotado",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Almond => "Almond",
            Self::Round => "Round",
            Self::Upturned => "Upturned",
            Self::Downturned => "Downturned",
            Self::Hooded => "Hooded",
        }
    }
}

impl std::fmt::Display for EyeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Inter-eye spacing relative to eye width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EyeSpacing {
    #[serde(rename = "juntos")]
    CloseSet,
    #[serde(rename = "separados")]
    WideSet,
    #[serde(rename = "proporcional")]
    Proportional,
}

impl EyeSpacing {
    pub fn key(&self) -> &'static str {
        match self {
            Self::CloseSet => "juntos",
            Self::WideSet => "separados",
            Self::Proportional => "proporcional",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CloseSet => "Close-set",
            Self::WideSet => "Wide-set",
            Self::Proportional => "Proportional",
        }
    }
}

impl std::fmt::Display for EyeSpacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeShapeResult {
    pub shape: EyeShape,
    pub confidence: u8,
    pub features: EyeFeatureVector,
    pub spacing: EyeSpacing,
}

/// Cascade thresholds and the confidence attached to each branch.
///
/// Angles are in degrees; confidences are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeThresholds {
    /// Hood score below which the eye is hooded outright
    pub hood_strict: f32,
    pub hood_strict_confidence: u32,
    /// Hood score below which a narrow eye is still read as hooded
    pub hood_loose: f32,
    pub hooded_ear_max: f32,
    pub hood_loose_confidence: u32,

    /// Tilt above which the eye is upturned for any hood or opening
    pub upturn_strong: f32,
    pub upturn_base: u32,
    pub upturn_cap: u32,
    pub upturn_mild: f32,
    pub upturn_mild_ear_max: f32,
    pub upturn_mild_confidence: u32,

    /// Tilt below which the eye is downturned (negative)
    pub downturn_strong: f32,
    pub downturn_base: u32,
    pub downturn_gain: f32,
    pub downturn_cap: u32,
    pub downturn_mild: f32,
    pub downturn_mild_ear_min: f32,
    pub downturn_mild_confidence: u32,

    pub round_ear_min: f32,
    /// Max |tilt| for a level eye
    pub round_level_angle: f32,
    pub round_ear_pivot: f32,
    pub round_ear_gain: f32,
    pub round_base: u32,
    pub round_cap: u32,
    /// EAR that reads as round at any tilt
    pub round_ear_strong: f32,
    pub round_strong_confidence: u32,

    pub almond_ear_min: f32,
    pub almond_ear_max: f32,
    pub almond_angle_max: f32,
    pub almond_hood_min: f32,
    pub almond_base: u32,
    /// Added per almond criterion met
    pub almond_step: u32,

    pub spacing_close: f32,
    pub spacing_wide: f32,
}

impl Default for EyeThresholds {
    fn default() -> Self {
        Self {
            hood_strict: 0.90,
            hood_strict_confidence: 80,
            hood_loose: 1.15,
            hooded_ear_max: 0.24,
            hood_loose_confidence: 60,

            upturn_strong: 12.0,
            upturn_base: 60,
            upturn_cap: 85,
            upturn_mild: 9.0,
            upturn_mild_ear_max: 0.28,
            upturn_mild_confidence: 55,

            downturn_strong: -6.0,
            downturn_base: 55,
            downturn_gain: 2.0,
            downturn_cap: 85,
            downturn_mild: -4.0,
            downturn_mild_ear_min: 0.24,
            downturn_mild_confidence: 50,

            round_ear_min: 0.34,
            round_level_angle: 6.0,
            round_ear_pivot: 0.30,
            round_ear_gain: 200.0,
            round_base: 55,
            round_cap: 85,
            round_ear_strong: 0.38,
            round_strong_confidence: 70,

            almond_ear_min: 0.20,
            almond_ear_max: 0.34,
            almond_angle_max: 9.0,
            almond_hood_min: 1.15,
            almond_base: 45,
            almond_step: 14,

            spacing_close: 0.85,
            spacing_wide: 1.15,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EyeShapeClassifier {
    thresholds: EyeThresholds,
}

impl EyeShapeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: EyeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EyeThresholds {
        &self.thresholds
    }

    pub fn classify(&self, features: &EyeFeatureVector) -> EyeShapeResult {
        let (shape, confidence) = self.cascade(features);
        let spacing = self.spacing(features.spacing_ratio);
        debug!(
            shape = shape.key(),
            confidence,
            spacing = spacing.key(),
            "eye shape"
        );
        EyeShapeResult {
            shape,
            confidence: confidence.min(100) as u8,
            features: *features,
            spacing,
        }
    }

    /// Extract features from landmarks and classify them.
    pub fn classify_landmarks(&self, landmarks: &LandmarkSet) -> Result<EyeShapeResult> {
        Ok(self.classify(&extract_eye_features(landmarks)?))
    }

    pub fn spacing(&self, ratio: f32) -> EyeSpacing {
        let t = &self.thresholds;
        if ratio < t.spacing_close {
            EyeSpacing::CloseSet
        } else if ratio > t.spacing_wide {
            EyeSpacing::WideSet
        } else {
            EyeSpacing::Proportional
        }
    }

    fn cascade(&self, f: &EyeFeatureVector) -> (EyeShape, u32) {
        let t = &self.thresholds;
        let ear = f.ear;
        let angle = f.corner_angle;
        let hood = f.hood_score;

        // A pronounced tilt dominates the brow
        if angle <= t.upturn_strong {
            if hood < t.hood_strict {
                return (EyeShape::Hooded, t.hood_strict_confidence);
            }
            if hood < t.hood_loose && ear < t.hooded_ear_max {
                return (EyeShape::Hooded, t.hood_loose_confidence);
            }
        }

        if angle > t.upturn_strong {
            let c = t.upturn_base.saturating_add(angle.round() as u32);
            return (EyeShape::Upturned, c.min(t.upturn_cap));
        }
        if angle > t.upturn_mild && ear < t.upturn_mild_ear_max {
            return (EyeShape::Upturned, t.upturn_mild_confidence);
        }

        if angle < t.downturn_strong {
            let c = t
                .downturn_base
                .saturating_add((t.downturn_gain * angle.abs()).round() as u32);
            return (EyeShape::Downturned, c.min(t.downturn_cap));
        }
        if angle < t.downturn_mild && ear >= t.downturn_mild_ear_min {
            return (EyeShape::Downturned, t.downturn_mild_confidence);
        }

        if ear > t.round_ear_min && angle.abs() < t.round_level_angle {
            let gain = (t.round_ear_gain * (ear - t.round_ear_pivot)).round() as u32;
            let c = t.round_base.saturating_add(gain);
            return (EyeShape::Round, c.min(t.round_cap));
        }
        if ear > t.round_ear_strong {
            return (EyeShape::Round, t.round_strong_confidence);
        }

        let met = [
            (t.almond_ear_min..=t.almond_ear_max).contains(&ear),
            angle.abs() <= t.almond_angle_max,
            hood >= t.almond_hood_min,
        ]
        .iter()
        .filter(|&&m| m)
        .count() as u32;
        (
            EyeShape::Almond,
            t.almond_base.saturating_add(t.almond_step.saturating_mul(met)),
        )
    }
}

/// Extract and classify eye shape with default thresholds.
pub fn classify_eye_shape(landmarks: &LandmarkSet) -> Result<EyeShapeResult> {
    EyeShapeClassifier::new().classify_landmarks(landmarks)
}
