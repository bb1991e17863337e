//! Numeric thresholds for an analysis run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Full marks for a single question.
    #[serde(default = "default_full_marks")]
    pub full_marks_per_question: f64,
    /// Share of the attainable total needed to pass.
    #[serde(default = "default_pass_fraction")]
    pub pass_fraction: f64,
    /// Students at or below this share of the attainable total are flagged.
    #[serde(default = "default_focus_fraction")]
    pub focus_fraction: f64,
    /// Share of the class always flagged from the bottom (at least one).
    #[serde(default = "default_bottom_fraction")]
    pub bottom_fraction: f64,
    /// Assumed test length used as the coverage denominator.
    #[serde(default = "default_coverage_question_count")]
    pub coverage_question_count: usize,
    /// Questions up to this number count as the first half of the paper.
    #[serde(default = "default_first_half_cutoff")]
    pub first_half_cutoff: u32,
    /// Optional TOML catalog replacing the built-in one.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_full_marks() -> f64 {
    3.0
}
fn default_pass_fraction() -> f64 {
    0.6
}
fn default_focus_fraction() -> f64 {
    0.6
}
fn default_bottom_fraction() -> f64 {
    0.10
}
fn default_coverage_question_count() -> usize {
    20
}
fn default_first_half_cutoff() -> u32 {
    10
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            full_marks_per_question: default_full_marks(),
            pass_fraction: default_pass_fraction(),
            focus_fraction: default_focus_fraction(),
            bottom_fraction: default_bottom_fraction(),
            coverage_question_count: default_coverage_question_count(),
            first_half_cutoff: default_first_half_cutoff(),
            catalog_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Load from a TOML file. Relative catalog paths resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if let (Some(catalog), Some(dir)) = (&config.catalog_path, path.parent()) {
            if catalog.is_relative() {
                config.catalog_path = Some(dir.join(catalog));
            }
        }

        config.validate()?;
        tracing::debug!("loaded analysis config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.full_marks_per_question.is_nan() || self.full_marks_per_question <= 0.0 {
            bail!(
                "full_marks_per_question must be positive, got {}",
                self.full_marks_per_question
            );
        }
        for (name, value) in [
            ("pass_fraction", self.pass_fraction),
            ("focus_fraction", self.focus_fraction),
            ("bottom_fraction", self.bottom_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within [0, 1], got {value}");
            }
        }
        if self.coverage_question_count == 0 {
            bail!("coverage_question_count must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_reference_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.full_marks_per_question, 3.0);
        assert_eq!(config.pass_fraction, 0.6);
        assert_eq!(config.bottom_fraction, 0.10);
        assert_eq!(config.coverage_question_count, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "full_marks_per_question = 5.0").unwrap();
        writeln!(file, "catalog_path = \"catalog.toml\"").unwrap();
        file.flush().unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.full_marks_per_question, 5.0);
        assert_eq!(config.coverage_question_count, 20);
        let catalog = config.catalog_path.unwrap();
        assert_eq!(catalog, file.path().parent().unwrap().join("catalog.toml"));
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let config = AnalysisConfig {
            bottom_fraction: 1.5,
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bottom_fraction"));
    }

    #[test]
    fn rejects_zero_full_marks() {
        let config = AnalysisConfig {
            full_marks_per_question: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
