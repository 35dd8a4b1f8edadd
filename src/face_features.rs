//! Face feature extraction.
//!
//! Converts one landmark frame into a fixed, scale-invariant set of 19 ratios
//! and angles. Widths are measured twice: between fixed anatomical landmark
//! pairs, and by scanning the face-oval contour for its horizontal extent at a
//! given height. The larger of the two is kept, because the contour always
//! traces the true face edge while a fixed pair can sit inside it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::geometry::{
    coefficient_of_variation, distance, mean, point_line_distance, safe_ratio, vertex_angle,
};
use crate::landmarks::{indices, FACE_OVAL, JAW_ARC_LEFT, JAW_ARC_RIGHT, MIN_LANDMARKS};
use crate::types::{LandmarkSet, Point};

/// Number of values in a [`FaceFeatureVector`].
pub const FACE_FEATURE_COUNT: usize = 19;

/// Field names in [`FaceFeatureVector::values`] order.
pub const FACE_FEATURE_NAMES: [&str; FACE_FEATURE_COUNT] = [
    "width_height_ratio",
    "forehead_height_ratio",
    "jaw_height_ratio",
    "forehead_cheek_ratio",
    "jaw_cheek_ratio",
    "jaw_forehead_ratio",
    "chin_jaw_ratio",
    "upper_third",
    "middle_third",
    "lower_third",
    "chin_length_ratio",
    "cheek_jaw_taper",
    "forehead_jaw_taper",
    "jaw_chin_taper",
    "jaw_angle",
    "chin_angle",
    "jaw_curvature",
    "width_variance",
    "cheek_prominence",
];

/// Scale-invariant face geometry derived from one landmark frame.
///
/// Every width is expressed relative to the face height or to another width;
/// angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceFeatureVector {
    /// Cheekbone width / face height
    pub width_height_ratio: f32,
    /// Forehead width / face height
    pub forehead_height_ratio: f32,
    /// Jaw width / face height
    pub jaw_height_ratio: f32,
    pub forehead_cheek_ratio: f32,
    pub jaw_cheek_ratio: f32,
    pub jaw_forehead_ratio: f32,
    pub chin_jaw_ratio: f32,
    /// Hairline to glabella / face height
    pub upper_third: f32,
    /// Glabella to nose base / face height
    pub middle_third: f32,
    /// Nose base to chin / face height
    pub lower_third: f32,
    /// Lower lip to chin / face height
    pub chin_length_ratio: f32,
    /// (cheekbone - jaw) / cheekbone
    pub cheek_jaw_taper: f32,
    /// (forehead - jaw) / forehead
    pub forehead_jaw_taper: f32,
    /// (jaw - chin) / jaw
    pub jaw_chin_taper: f32,
    /// Cheekbone-gonion-chin angle, mean of both sides
    pub jaw_angle: f32,
    /// Gonion-chin-gonion angle
    pub chin_angle: f32,
    /// Mean deviation of the jaw contour from the cheekbone-chin chord,
    /// relative to face height
    pub jaw_curvature: f32,
    /// Coefficient of variation of forehead, cheekbone and jaw widths
    pub width_variance: f32,
    /// Cheekbone / max(forehead, jaw)
    pub cheek_prominence: f32,
}

impl FaceFeatureVector {
    /// Mid-range values of an average face. Used wherever a ratio cannot be
    /// computed, so a missing measurement never pushes a score either way.
    pub const fn neutral() -> Self {
        Self {
            width_height_ratio: 0.72,
            forehead_height_ratio: 0.66,
            jaw_height_ratio: 0.56,
            forehead_cheek_ratio: 0.92,
            jaw_cheek_ratio: 0.78,
            jaw_forehead_ratio: 0.85,
            chin_jaw_ratio: 0.45,
            upper_third: 0.33,
            middle_third: 0.33,
            lower_third: 0.34,
            chin_length_ratio: 0.18,
            cheek_jaw_taper: 0.22,
            forehead_jaw_taper: 0.15,
            jaw_chin_taper: 0.55,
            jaw_angle: 130.0,
            chin_angle: 120.0,
            jaw_curvature: 0.02,
            width_variance: 0.10,
            cheek_prominence: 1.09,
        }
    }

    /// Normalize raw width/height measurements into the feature set. Features
    /// that need landmarks beyond the four measurements take neutral values.
    pub fn from_measurements(m: &FaceMeasurements) -> Self {
        let n = Self::neutral();
        let h = m.face_length;
        let (fw, cw, jw) = (m.forehead_width, m.cheekbone_width, m.jawline_width);
        Self {
            width_height_ratio: safe_ratio(cw, h, n.width_height_ratio),
            forehead_height_ratio: safe_ratio(fw, h, n.forehead_height_ratio),
            jaw_height_ratio: safe_ratio(jw, h, n.jaw_height_ratio),
            forehead_cheek_ratio: safe_ratio(fw, cw, n.forehead_cheek_ratio),
            jaw_cheek_ratio: safe_ratio(jw, cw, n.jaw_cheek_ratio),
            jaw_forehead_ratio: safe_ratio(jw, fw, n.jaw_forehead_ratio),
            cheek_jaw_taper: safe_ratio(cw - jw, cw, n.cheek_jaw_taper),
            forehead_jaw_taper: safe_ratio(fw - jw, fw, n.forehead_jaw_taper),
            width_variance: width_variance(fw, cw, jw, n.width_variance),
            cheek_prominence: safe_ratio(cw, fw.max(jw), n.cheek_prominence),
            ..n
        }
    }

    /// All values in [`FACE_FEATURE_NAMES`] order.
    pub fn values(&self) -> [f32; FACE_FEATURE_COUNT] {
        [
            self.width_height_ratio,
            self.forehead_height_ratio,
            self.jaw_height_ratio,
            self.forehead_cheek_ratio,
            self.jaw_cheek_ratio,
            self.jaw_forehead_ratio,
            self.chin_jaw_ratio,
            self.upper_third,
            self.middle_third,
            self.lower_third,
            self.chin_length_ratio,
            self.cheek_jaw_taper,
            self.forehead_jaw_taper,
            self.jaw_chin_taper,
            self.jaw_angle,
            self.chin_angle,
            self.jaw_curvature,
            self.width_variance,
            self.cheek_prominence,
        ]
    }

    /// Inverse of [`values`](Self::values).
    pub fn from_values(v: [f32; FACE_FEATURE_COUNT]) -> Self {
        Self {
            width_height_ratio: v[0],
            forehead_height_ratio: v[1],
            jaw_height_ratio: v[2],
            forehead_cheek_ratio: v[3],
            jaw_cheek_ratio: v[4],
            jaw_forehead_ratio: v[5],
            chin_jaw_ratio: v[6],
            upper_third: v[7],
            middle_third: v[8],
            lower_third: v[9],
            chin_length_ratio: v[10],
            cheek_jaw_taper: v[11],
            forehead_jaw_taper: v[12],
            jaw_chin_taper: v[13],
            jaw_angle: v[14],
            chin_angle: v[15],
            jaw_curvature: v[16],
            width_variance: v[17],
            cheek_prominence: v[18],
        }
    }
}

impl Default for FaceFeatureVector {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Raw face length and widths, in whatever unit the caller measured them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMeasurements {
    pub face_length: f32,
    pub forehead_width: f32,
    pub cheekbone_width: f32,
    pub jawline_width: f32,
}

impl FaceMeasurements {
    /// Measure the fixed landmark pairs in a `frame_width` x `frame_height`
    /// pixel frame. No contour reconciliation is applied.
    pub fn from_landmarks(
        landmarks: &LandmarkSet,
        frame_width: f32,
        frame_height: f32,
    ) -> Result<Self> {
        check_len(landmarks)?;
        let d = |a: usize, b: usize| {
            landmarks[a].scaled_distance(&landmarks[b], frame_width, frame_height)
        };
        Ok(Self {
            face_length: d(indices::HAIRLINE, indices::CHIN),
            forehead_width: d(indices::FOREHEAD_LEFT, indices::FOREHEAD_RIGHT),
            cheekbone_width: d(indices::CHEEKBONE_LEFT, indices::CHEEKBONE_RIGHT),
            jawline_width: d(indices::JAW_LEFT, indices::JAW_RIGHT),
        })
    }
}

/// Face feature extractor with configurable scan levels and size gate.
#[derive(Debug, Clone, Default)]
pub struct FaceFeatureExtractor {
    config: ExtractionConfig,
}

impl FaceFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Face height and the contour-validated forehead, cheekbone and jaw
    /// widths, in normalized units.
    pub fn measure(&self, landmarks: &LandmarkSet) -> Result<FaceMeasurements> {
        check_len(landmarks)?;

        let hairline = landmarks[indices::HAIRLINE];
        let chin = landmarks[indices::CHIN];
        let face_length = distance(hairline, chin);
        let min = self.config.min_face_height;
        // Negated comparison so a NaN height is rejected too
        if !(face_length >= min) {
            return Err(Error::DegenerateGeometry {
                face_height: face_length,
                min,
            });
        }

        let width = |left: usize, right: usize, level: f32| {
            let fixed = distance(landmarks[left], landmarks[right]);
            match self.scan_width(landmarks, hairline, chin, level) {
                Some(scanned) => fixed.max(scanned),
                None => fixed,
            }
        };

        Ok(FaceMeasurements {
            face_length,
            forehead_width: width(
                indices::FOREHEAD_LEFT,
                indices::FOREHEAD_RIGHT,
                self.config.forehead_level,
            ),
            cheekbone_width: width(
                indices::CHEEKBONE_LEFT,
                indices::CHEEKBONE_RIGHT,
                self.config.cheekbone_level,
            ),
            jawline_width: width(indices::JAW_LEFT, indices::JAW_RIGHT, self.config.jaw_level),
        })
    }

    /// Extract the full feature vector from one frame.
    pub fn extract(&self, landmarks: &LandmarkSet) -> Result<FaceFeatureVector> {
        let m = self.measure(landmarks)?;
        let n = FaceFeatureVector::neutral();
        let p = |idx: usize| landmarks[idx];

        let h = m.face_length;
        let (fw, cw, jw) = (m.forehead_width, m.cheekbone_width, m.jawline_width);
        let chin_w = distance(p(indices::CHIN_LEFT), p(indices::CHIN_RIGHT));

        let upper = distance(p(indices::HAIRLINE), p(indices::GLABELLA));
        let middle = distance(p(indices::GLABELLA), p(indices::SUBNASALE));
        let lower = distance(p(indices::SUBNASALE), p(indices::CHIN));
        let chin_len = distance(p(indices::LOWER_LIP), p(indices::CHIN));

        let chin = p(indices::CHIN);
        let jaw_angle = mean(&[
            vertex_angle(p(indices::CHEEKBONE_LEFT), p(indices::JAW_LEFT), chin),
            vertex_angle(p(indices::CHEEKBONE_RIGHT), p(indices::JAW_RIGHT), chin),
        ]);
        let chin_angle = vertex_angle(p(indices::JAW_LEFT), chin, p(indices::JAW_RIGHT));

        let arc_deviation = |arc: &[usize], cheek: Point| {
            let d: Vec<f32> = arc
                .iter()
                .map(|&i| point_line_distance(p(i), cheek, chin))
                .collect();
            mean(&d)
        };
        let curvature = safe_ratio(
            mean(&[
                arc_deviation(&JAW_ARC_LEFT[..], p(indices::CHEEKBONE_LEFT)),
                arc_deviation(&JAW_ARC_RIGHT[..], p(indices::CHEEKBONE_RIGHT)),
            ]),
            h,
            n.jaw_curvature,
        );

        debug!(
            face_height = h,
            forehead = fw,
            cheekbone = cw,
            jaw = jw,
            chin = chin_w,
            "measured face widths"
        );

        Ok(FaceFeatureVector {
            width_height_ratio: safe_ratio(cw, h, n.width_height_ratio),
            forehead_height_ratio: safe_ratio(fw, h, n.forehead_height_ratio),
            jaw_height_ratio: safe_ratio(jw, h, n.jaw_height_ratio),
            forehead_cheek_ratio: safe_ratio(fw, cw, n.forehead_cheek_ratio),
            jaw_cheek_ratio: safe_ratio(jw, cw, n.jaw_cheek_ratio),
            jaw_forehead_ratio: safe_ratio(jw, fw, n.jaw_forehead_ratio),
            chin_jaw_ratio: safe_ratio(chin_w, jw, n.chin_jaw_ratio),
            upper_third: safe_ratio(upper, h, n.upper_third),
            middle_third: safe_ratio(middle, h, n.middle_third),
            lower_third: safe_ratio(lower, h, n.lower_third),
            chin_length_ratio: safe_ratio(chin_len, h, n.chin_length_ratio),
            cheek_jaw_taper: safe_ratio(cw - jw, cw, n.cheek_jaw_taper),
            forehead_jaw_taper: safe_ratio(fw - jw, fw, n.forehead_jaw_taper),
            jaw_chin_taper: safe_ratio(jw - chin_w, jw, n.jaw_chin_taper),
            jaw_angle: finite_or(jaw_angle, n.jaw_angle),
            chin_angle: finite_or(chin_angle, n.chin_angle),
            jaw_curvature: curvature,
            width_variance: width_variance(fw, cw, jw, n.width_variance),
            cheek_prominence: safe_ratio(cw, fw.max(jw), n.cheek_prominence),
        })
    }

    /// Horizontal extent of the face-oval points lying within the tolerance
    /// band around `level` (a fraction of the hairline-to-chin drop).
    fn scan_width(
        &self,
        landmarks: &LandmarkSet,
        hairline: Point,
        chin: Point,
        level: f32,
    ) -> Option<f32> {
        let drop = chin.y - hairline.y;
        let target = hairline.y + level * drop;
        let band = self.config.scan_tolerance * drop.abs();

        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut hits = 0usize;
        for &idx in FACE_OVAL.iter() {
            let p = landmarks[idx];
            if (p.y - target).abs() <= band && p.x.is_finite() {
                min_x = min_x.min(p.x);
                max_x = max_x.max(p.x);
                hits += 1;
            }
        }

        (hits >= 2).then(|| max_x - min_x)
    }
}

/// Extract face features with the default configuration.
pub fn extract_face_features(landmarks: &LandmarkSet) -> Result<FaceFeatureVector> {
    FaceFeatureExtractor::new().extract(landmarks)
}

fn check_len(landmarks: &LandmarkSet) -> Result<()> {
    if landmarks.len() < MIN_LANDMARKS {
        return Err(Error::InsufficientLandmarks {
            got: landmarks.len(),
            required: MIN_LANDMARKS,
        });
    }
    Ok(())
}

fn width_variance(forehead: f32, cheekbone: f32, jaw: f32, fallback: f32) -> f32 {
    finite_or(coefficient_of_variation(&[forehead, cheekbone, jaw]), fallback)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
