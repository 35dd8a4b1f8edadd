//! Face shape classification.
//!
//! Weighted rule accumulation: each class owns a list of independent threshold
//! predicates over the feature vector, and every predicate that holds adds its
//! points to that class. Commonly confused pairs are then separated by a
//! single discriminating feature, but only when both scores are already
//! substantial so a clear winner is never overridden.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::face_features::{FaceFeatureVector, FaceMeasurements};
use crate::geometry::safe_ratio;

/// Face confidence never exceeds this.
pub const FACE_CONFIDENCE_CAP: u32 = 95;

/// Face shape categories.
///
/// Serialized with the recommendation-table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceShape {
    /// Balanced proportions, slightly longer than wide
    #[serde(rename = "ovalado")]
    Oval,
    /// Width close to length, soft jaw
    #[serde(rename = "redondo")]
    Round,
    /// Width close to length, angular jaw
    #[serde(rename = "cuadrado")]
    Square,
    /// Wide forehead, narrow pointed chin
    #[serde(rename = "corazon")]
    Heart,
    /// Markedly longer than wide
    #[serde(rename = "alargado")]
    Oblong,
    /// Narrow forehead and jaw, prominent cheekbones
    #[serde(rename = "diamante")]
    Diamond,
}

impl FaceShape {
    /// All shapes, in tie-break order.
    pub const ALL: [FaceShape; 6] = [
        FaceShape::Oval,
        FaceShape::Round,
        FaceShape::Square,
        FaceShape::Heart,
        FaceShape::Oblong,
        FaceShape::Diamond,
    ];

    /// Recommendation-table key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Oval => "ovalado",
            Self::Round => "redondo",
            Self::Square => "cuadrado",
            Self::Heart => "corazon",
            Self::Oblong => "alargado",
            Self::Diamond => "diamante",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oval => "Oval",
            Self::Round => "Round",
            Self::Square => "Square",
            Self::Heart => "Heart",
            Self::Oblong => "Oblong",
            Self::Diamond => "Diamond",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Oval => 0,
            Self::Round => 1,
            Self::Square => 2,
            Self::Heart => 3,
            Self::Oblong => 4,
            Self::Diamond => 5,
        }
    }
}

impl std::fmt::Display for FaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer score per face shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTable {
    scores: [u32; 6],
}

impl ScoreTable {
    pub fn get(&self, shape: FaceShape) -> u32 {
        self.scores[shape.index()]
    }

    pub fn add(&mut self, shape: FaceShape, points: u32) {
        let score = &mut self.scores[shape.index()];
        *score = score.saturating_add(points);
    }

    pub fn total(&self) -> u32 {
        self.scores.iter().fold(0u32, |acc, s| acc.saturating_add(*s))
    }

    /// Shapes by descending score; equal scores keep [`FaceShape::ALL`] order.
    pub fn ranked(&self) -> Vec<(FaceShape, u32)> {
        let mut ranked: Vec<(FaceShape, u32)> =
            FaceShape::ALL.iter().map(|&s| (s, self.get(s))).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

impl Serialize for ScoreTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FaceShape::ALL.len()))?;
        for (shape, score) in self.ranked() {
            map.serialize_entry(shape.key(), &score)?;
        }
        map.end()
    }
}

/// Face shape classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceShapeResult {
    pub shape: FaceShape,
    /// 0..=95
    pub confidence: u8,
    /// Cheekbone width / face height
    pub width_height_ratio: f32,
    /// Jaw width / forehead width
    pub jaw_forehead_ratio: f32,
    /// Cheekbone width / jaw width
    pub cheek_jaw_ratio: f32,
    /// Final score of every class, after disambiguation
    pub scores: ScoreTable,
}

/// Thresholds and points for every face rule.
///
/// Values are an empirical starting calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceThresholds {
    // Oval
    pub oval_whr_min: f32,
    pub oval_whr_max: f32,
    pub oval_jaw_forehead_min: f32,
    pub oval_jaw_forehead_max: f32,
    pub oval_jaw_angle_min: f32,
    pub oval_jaw_angle_max: f32,
    /// Forehead/cheekbone at or below which the cheekbones count as widest
    pub oval_forehead_cheek_max: f32,
    /// Jaw/cheekbone below which the cheekbones count as widest
    pub oval_jaw_cheek_max: f32,

    // Round
    pub round_whr_min: f32,
    /// Width variance below which forehead, cheekbone and jaw count as uniform
    pub uniform_width_variance: f32,
    pub round_jaw_angle_min: f32,
    pub round_curvature_min: f32,
    pub round_jaw_forehead_min: f32,
    pub round_jaw_forehead_max: f32,

    // Square
    pub square_whr_min: f32,
    pub square_whr_max: f32,
    pub square_jaw_forehead_min: f32,
    pub square_jaw_cheek_min: f32,
    pub square_jaw_angle_max: f32,

    // Heart
    pub heart_forehead_cheek_min: f32,
    pub heart_jaw_forehead_max: f32,
    pub heart_whr_min: f32,
    pub heart_whr_max: f32,
    /// Chin angle below which the chin reads as pointed
    pub pointed_chin_angle: f32,

    // Oblong
    pub oblong_whr_max: f32,
    pub oblong_whr_strong: f32,
    /// Max |forehead - jaw| / widest width for matching upper and lower widths
    pub oblong_forehead_jaw_similarity: f32,

    // Diamond
    pub diamond_prominence_min: f32,
    pub diamond_forehead_cheek_max: f32,
    pub diamond_jaw_cheek_max: f32,

    // Disambiguation
    /// Both scores must exceed this before a pair is disambiguated
    pub contention_score: u32,
    pub disambiguation_bonus: u32,
    /// Jaw angle at or above which round beats square
    pub round_square_jaw_angle: f32,
    /// Width/height below which oval beats round
    pub oval_round_whr: f32,
    /// Jaw/forehead below which heart beats oval
    pub oval_heart_jaw_forehead: f32,
    /// Forehead/cheekbone at or above which heart beats diamond
    pub diamond_heart_forehead_cheek: f32,
    /// Width/height below which oblong beats oval
    pub oblong_oval_whr: f32,

    // Confidence
    pub margin_multiplier: u32,
    pub margin_bonus_cap: u32,
}

impl Default for FaceThresholds {
    fn default() -> Self {
        Self {
            oval_whr_min: 0.64,
            oval_whr_max: 0.80,
            oval_jaw_forehead_min: 0.75,
            oval_jaw_forehead_max: 0.95,
            oval_jaw_angle_min: 120.0,
            oval_jaw_angle_max: 140.0,
            oval_forehead_cheek_max: 1.0,
            oval_jaw_cheek_max: 1.0,

            round_whr_min: 0.82,
            uniform_width_variance: 0.08,
            round_jaw_angle_min: 135.0,
            round_curvature_min: 0.03,
            round_jaw_forehead_min: 0.90,
            round_jaw_forehead_max: 1.05,

            square_whr_min: 0.78,
            square_whr_max: 0.95,
            square_jaw_forehead_min: 0.88,
            square_jaw_cheek_min: 0.88,
            square_jaw_angle_max: 120.0,

            heart_forehead_cheek_min: 0.95,
            heart_jaw_forehead_max: 0.78,
            heart_whr_min: 0.65,
            heart_whr_max: 0.82,
            pointed_chin_angle: 110.0,

            oblong_whr_max: 0.65,
            oblong_whr_strong: 0.60,
            oblong_forehead_jaw_similarity: 0.15,

            diamond_prominence_min: 1.10,
            diamond_forehead_cheek_max: 0.85,
            diamond_jaw_cheek_max: 0.85,

            contention_score: 4,
            disambiguation_bonus: 2,
            round_square_jaw_angle: 128.0,
            oval_round_whr: 0.80,
            oval_heart_jaw_forehead: 0.78,
            diamond_heart_forehead_cheek: 0.95,
            oblong_oval_whr: 0.65,

            margin_multiplier: 3,
            margin_bonus_cap: 15,
        }
    }
}

/// One scoring predicate after evaluation.
#[derive(Debug, Clone, Copy)]
struct Rule {
    shape: FaceShape,
    points: u32,
    name: &'static str,
    holds: bool,
}

/// Rule-based face shape classifier.
#[derive(Debug, Clone, Default)]
pub struct FaceShapeClassifier {
    thresholds: FaceThresholds,
}

impl FaceShapeClassifier {
    /// Create with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom thresholds
    pub fn with_thresholds(thresholds: FaceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &FaceThresholds {
        &self.thresholds
    }

    /// Classify from a feature vector.
    pub fn classify(&self, f: &FaceFeatureVector) -> FaceShapeResult {
        let mut scores = ScoreTable::default();
        for rule in self.rules(f).into_iter().filter(|r| r.holds) {
            debug!(shape = rule.shape.key(), points = rule.points, rule = rule.name, "face rule");
            scores.add(rule.shape, rule.points);
        }

        let scores = self.disambiguate(f, scores);
        let ranked = scores.ranked();
        let (shape, top) = ranked[0];
        let second = ranked[1].1;
        let confidence = self.confidence(top, second, scores.total());

        debug!(shape = shape.key(), confidence, ?ranked, "face shape");

        FaceShapeResult {
            shape,
            confidence,
            width_height_ratio: f.width_height_ratio,
            jaw_forehead_ratio: f.jaw_forehead_ratio,
            cheek_jaw_ratio: safe_ratio(1.0, f.jaw_cheek_ratio, 1.0),
            scores,
        }
    }

    /// Classify raw width/height measurements.
    pub fn classify_measurements(&self, m: &FaceMeasurements) -> FaceShapeResult {
        self.classify(&FaceFeatureVector::from_measurements(m))
    }

    fn rules(&self, f: &FaceFeatureVector) -> Vec<Rule> {
        use FaceShape::*;
        let t = &self.thresholds;
        let whr = f.width_height_ratio;
        let jfr = f.jaw_forehead_ratio;
        let widest = f
            .width_height_ratio
            .max(f.forehead_height_ratio)
            .max(f.jaw_height_ratio);
        let forehead_jaw_gap = safe_ratio(
            (f.forehead_height_ratio - f.jaw_height_ratio).abs(),
            widest,
            1.0,
        );
        let uniform = f.width_variance < t.uniform_width_variance;
        let pointed_chin = f.chin_angle < t.pointed_chin_angle;
        let rule = |shape, points, name, holds| Rule {
            shape,
            points,
            name,
            holds,
        };

        vec![
            rule(Oval, 3, "whr in oval band", (t.oval_whr_min..=t.oval_whr_max).contains(&whr)),
            rule(
                Oval,
                2,
                "cheekbones widest",
                f.forehead_cheek_ratio <= t.oval_forehead_cheek_max
                    && f.jaw_cheek_ratio < t.oval_jaw_cheek_max,
            ),
            rule(
                Oval,
                1,
                "moderate jaw taper",
                (t.oval_jaw_forehead_min..=t.oval_jaw_forehead_max).contains(&jfr),
            ),
            rule(
                Oval,
                1,
                "defined soft jaw",
                (t.oval_jaw_angle_min..t.oval_jaw_angle_max).contains(&f.jaw_angle),
            ),
            rule(Round, 3, "wide face", whr >= t.round_whr_min),
            rule(Round, 2, "uniform widths", uniform),
            rule(Round, 3, "obtuse jaw", f.jaw_angle >= t.round_jaw_angle_min),
            rule(Round, 1, "curved jaw", f.jaw_curvature >= t.round_curvature_min),
            rule(
                Round,
                1,
                "jaw matches forehead",
                (t.round_jaw_forehead_min..=t.round_jaw_forehead_max).contains(&jfr),
            ),
            rule(
                Square,
                1,
                "whr in square band",
                (t.square_whr_min..=t.square_whr_max).contains(&whr),
            ),
            rule(Square, 2, "broad jaw vs forehead", jfr >= t.square_jaw_forehead_min),
            rule(
                Square,
                2,
                "broad jaw vs cheekbones",
                f.jaw_cheek_ratio >= t.square_jaw_cheek_min,
            ),
            rule(Square, 4, "angular jaw", f.jaw_angle < t.square_jaw_angle_max),
            rule(Square, 1, "uniform widths", uniform),
            rule(
                Heart,
                2,
                "wide forehead",
                f.forehead_cheek_ratio >= t.heart_forehead_cheek_min,
            ),
            rule(Heart, 3, "strong jaw taper", jfr < t.heart_jaw_forehead_max),
            rule(Heart, 2, "pointed chin", pointed_chin),
            rule(
                Heart,
                1,
                "whr in heart band",
                (t.heart_whr_min..=t.heart_whr_max).contains(&whr),
            ),
            rule(Oblong, 3, "long face", whr < t.oblong_whr_max),
            rule(Oblong, 2, "very long face", whr < t.oblong_whr_strong),
            rule(
                Oblong,
                1,
                "forehead matches jaw",
                forehead_jaw_gap < t.oblong_forehead_jaw_similarity,
            ),
            rule(
                Diamond,
                3,
                "prominent cheekbones",
                f.cheek_prominence >= t.diamond_prominence_min,
            ),
            rule(
                Diamond,
                2,
                "narrow forehead",
                f.forehead_cheek_ratio < t.diamond_forehead_cheek_max,
            ),
            rule(Diamond, 1, "narrow jaw", f.jaw_cheek_ratio < t.diamond_jaw_cheek_max),
            rule(Diamond, 1, "pointed chin", pointed_chin),
        ]
    }

    /// Break near-ties between commonly confused pairs. Contention is judged
    /// on the accumulated scores, so the order of the pairs does not matter.
    fn disambiguate(&self, f: &FaceFeatureVector, scores: ScoreTable) -> ScoreTable {
        use FaceShape::*;
        let t = &self.thresholds;
        let pairs = [
            (Round, Square, f.jaw_angle >= t.round_square_jaw_angle),
            (Oval, Round, f.width_height_ratio < t.oval_round_whr),
            (Heart, Oval, f.jaw_forehead_ratio < t.oval_heart_jaw_forehead),
            (Heart, Diamond, f.forehead_cheek_ratio >= t.diamond_heart_forehead_cheek),
            (Oblong, Oval, f.width_height_ratio < t.oblong_oval_whr),
        ];

        let mut resolved = scores;
        for (first, other, first_wins) in pairs {
            if scores.get(first) > t.contention_score && scores.get(other) > t.contention_score {
                let winner = if first_wins { first } else { other };
                debug!(
                    winner = winner.key(),
                    pair = ?(first, other),
                    "disambiguated"
                );
                resolved.add(winner, t.disambiguation_bonus);
            }
        }
        resolved
    }

    fn confidence(&self, top: u32, second: u32, total: u32) -> u8 {
        if total == 0 {
            return 0;
        }
        let t = &self.thresholds;
        let dominance = top as f32 / total as f32 * 100.0;
        let margin = (top - second)
            .saturating_mul(t.margin_multiplier)
            .min(t.margin_bonus_cap);
        let confidence = (dominance + margin as f32).round() as u32;
        confidence.min(FACE_CONFIDENCE_CAP) as u8
    }
}

/// Classify with default thresholds.
pub fn classify_face_shape(features: &FaceFeatureVector) -> FaceShapeResult {
    FaceShapeClassifier::new().classify(features)
}
