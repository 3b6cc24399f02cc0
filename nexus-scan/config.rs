use std::path::Path;

use nexus_core::FeatureConfig;
use nexus_fast::FastDetector;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matcher::DEFAULT_RATIO;

/// Everything a scan needs besides its inputs. Fixed for the whole scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Lowe ratio for the 2-NN filter, in (0, 1)
    pub ratio_test_threshold: f32,
    /// A candidate is reported when its score is strictly above this, 0-100
    pub match_percentage_threshold: f64,
    /// Candidate file extensions, case-insensitive
    pub extensions: Vec<String>,
    /// Attach the bounding box of matched keypoints to each result
    pub highlight_region: bool,
    pub detector: FeatureConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ratio_test_threshold: DEFAULT_RATIO,
            match_percentage_threshold: 10.0,
            extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            highlight_region: true,
            detector: FeatureConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.ratio_test_threshold;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "ratio_test_threshold",
                reason: format!("{} is outside (0, 1)", ratio),
            });
        }
        let threshold = self.match_percentage_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                field: "match_percentage_threshold",
                reason: format!("{} is outside [0, 100]", threshold),
            });
        }
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "extensions",
                reason: "no usable file extension".to_string(),
            });
        }
        FastDetector::validate_config(&self.detector)?;
        Ok(())
    }

    /// Load from a `.json` or `.toml` file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Format::of(path)? {
            Format::Json => Self::load_json(path),
            Format::Toml => Self::load_toml(path),
        }
    }

    /// Save as `.json` or `.toml`, chosen by extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        match Format::of(path)? {
            Format::Json => self.save_json(path),
            Format::Toml => self.save_toml(path),
        }
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ScanConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.ratio_test_threshold, 0.75);
        assert_eq!(cfg.match_percentage_threshold, 10.0);
    }

    #[test]
    fn ratio_bounds_are_exclusive() {
        for ratio in [0.0, 1.0, -0.5, f32::NAN] {
            let cfg = ScanConfig { ratio_test_threshold: ratio, ..ScanConfig::default() };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidValue { field: "ratio_test_threshold", .. })
            ));
        }
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        for threshold in [0.0, 100.0] {
            let cfg = ScanConfig { match_percentage_threshold: threshold, ..ScanConfig::default() };
            assert!(cfg.validate().is_ok());
        }
        let cfg = ScanConfig { match_percentage_threshold: 100.5, ..ScanConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let cfg = ScanConfig { extensions: vec![".".into()], ..ScanConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn detector_settings_are_checked() {
        let mut cfg = ScanConfig::default();
        cfg.detector.threshold = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Detector(_))));
    }

    #[test]
    fn json_and_toml_round_trip() {
        let mut cfg = ScanConfig::default();
        cfg.ratio_test_threshold = 0.6;
        cfg.highlight_region = false;
        cfg.detector.max_keypoints = 250;

        assert_eq!(ScanConfig::from_json(&cfg.to_json().unwrap()).unwrap(), cfg);
        assert_eq!(ScanConfig::from_toml(&cfg.to_toml().unwrap()).unwrap(), cfg);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg = ScanConfig::from_toml("match_percentage_threshold = 25.0\n[detector]\nthreshold = 30\n").unwrap();
        assert_eq!(cfg.match_percentage_threshold, 25.0);
        assert_eq!(cfg.detector.threshold, 30);
        assert_eq!(cfg.ratio_test_threshold, 0.75);
        assert_eq!(cfg.detector.patch_size, FeatureConfig::default().patch_size);
    }

    #[test]
    fn invalid_values_fail_on_load() {
        assert!(ScanConfig::from_json(r#"{"ratio_test_threshold": 1.5}"#).is_err());
        for radius in ["-2.0", "nan", "inf"] {
            let text = format!("[detector]\nnms_radius = {}\n", radius);
            assert!(matches!(ScanConfig::from_toml(&text), Err(ConfigError::Detector(_))), "{}", radius);
        }
    }

    #[test]
    fn default_file_has_no_machine_specific_values() {
        let text = ScanConfig::default().to_toml().unwrap();
        assert!(text.contains("n_threads = 0"), "{}", text);
        assert!(text.contains(&format!("max_keypoints = {}", nexus_core::DEFAULT_MAX_KEYPOINTS)));
    }

    #[test]
    fn file_format_follows_extension() {
        let dir = std::env::temp_dir().join(format!("nexus-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cfg = ScanConfig { match_percentage_threshold: 42.0, ..ScanConfig::default() };

        for name in ["scan.json", "scan.TOML"] {
            let path = dir.join(name);
            cfg.save(&path).unwrap();
            assert_eq!(ScanConfig::load(&path).unwrap(), cfg);
        }
        assert!(matches!(
            cfg.save(dir.join("scan.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
