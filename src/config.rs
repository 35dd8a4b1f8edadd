//! Tunable parameters for extraction and both classifiers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eye_shape::EyeThresholds;
use crate::face_shape::FaceThresholds;

/// Face feature extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Smallest usable hairline-to-chin distance, normalized units
    pub min_face_height: f32,
    /// Half-height of the contour scan band, fraction of the vertical face span
    pub scan_tolerance: f32,
    /// Scan levels as fractions of the hairline-to-chin drop
    pub forehead_level: f32,
    pub cheekbone_level: f32,
    pub jaw_level: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_face_height: 0.01,
            scan_tolerance: 0.06,
            forehead_level: 0.25,
            cheekbone_level: 0.45,
            jaw_level: 0.75,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_face_height > 0.0 && self.min_face_height.is_finite()) {
            return invalid(format!(
                "min_face_height must be positive, got {}",
                self.min_face_height
            ));
        }
        if !(self.scan_tolerance > 0.0 && self.scan_tolerance < 0.5) {
            return invalid(format!(
                "scan_tolerance must be in (0, 0.5), got {}",
                self.scan_tolerance
            ));
        }
        let levels = [self.forehead_level, self.cheekbone_level, self.jaw_level];
        let in_range = levels.iter().all(|&l| l > 0.0 && l < 1.0);
        let ordered = levels.windows(2).all(|w| w[0] < w[1]);
        if !(in_range && ordered) {
            return invalid(format!(
                "scan levels must be increasing within (0, 1), got {levels:?}"
            ));
        }
        Ok(())
    }
}

/// Everything the pipeline can be tuned with. Missing fields take their
/// defaults, so a config file only needs the values it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub extraction: ExtractionConfig,
    pub face: FaceThresholds,
    pub eye: EyeThresholds,
}

impl ClassifierConfig {
    /// Read and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;

        let face = &self.face;
        let bands = [
            ("oval_whr", face.oval_whr_min, face.oval_whr_max),
            ("oval_jaw_forehead", face.oval_jaw_forehead_min, face.oval_jaw_forehead_max),
            ("oval_jaw_angle", face.oval_jaw_angle_min, face.oval_jaw_angle_max),
            ("round_jaw_forehead", face.round_jaw_forehead_min, face.round_jaw_forehead_max),
            ("square_whr", face.square_whr_min, face.square_whr_max),
            ("heart_whr", face.heart_whr_min, face.heart_whr_max),
        ];
        for (name, min, max) in bands {
            if !(min <= max) {
                return invalid(format!("{name}: min {min} exceeds max {max}"));
            }
        }

        let eye = &self.eye;
        if !(eye.hood_strict < eye.hood_loose) {
            return invalid(format!(
                "hood_strict ({}) must be below hood_loose ({})",
                eye.hood_strict, eye.hood_loose
            ));
        }
        if !(eye.spacing_close < eye.spacing_wide) {
            return invalid(format!(
                "spacing_close ({}) must be below spacing_wide ({})",
                eye.spacing_close, eye.spacing_wide
            ));
        }
        if !(eye.upturn_mild <= eye.upturn_strong && eye.downturn_strong <= eye.downturn_mild) {
            return invalid("mild tilt thresholds must sit inside the strong ones".to_string());
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(Error::InvalidConfig(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        ClassifierConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"face": {"round_whr_min": 0.85}, "eye": {}}"#).unwrap();
        assert_eq!(config.face.round_whr_min, 0.85);
        assert_eq!(config.face.oval_whr_min, FaceThresholds::default().oval_whr_min);
        assert_eq!(config.eye, EyeThresholds::default());
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn rejects_non_positive_height() {
        let mut config = ClassifierConfig::default();
        config.extraction.min_face_height = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        config.extraction.min_face_height = f32::NAN;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_unordered_levels() {
        let mut config = ClassifierConfig::default();
        config.extraction.cheekbone_level = 0.8;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_hood_thresholds() {
        let mut config = ClassifierConfig::default();
        config.eye.hood_strict = 1.2;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_spacing() {
        let mut config = ClassifierConfig::default();
        config.eye.spacing_close = 1.2;
        config.eye.spacing_wide = 1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn load_reads_and_validates_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"extraction": {{"scan_tolerance": 0.05}}}}"#).unwrap();
        let config = ClassifierConfig::load(file.path()).unwrap();
        assert_eq!(config.extraction.scan_tolerance, 0.05);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"extraction": {{"jaw_level": 0.1}}}}"#).unwrap();
        assert!(matches!(
            ClassifierConfig::load(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_reports_malformed_and_missing_files() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ClassifierConfig::load(file.path()),
            Err(Error::Json(_))
        ));

        let path = file.path().to_path_buf();
        drop(file);
        assert!(matches!(ClassifierConfig::load(&path), Err(Error::Io(_))));
    }
}
