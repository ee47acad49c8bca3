//! TOML configuration for one tooth run.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use ssm::prelude::*;

/// Settings for building the model of one tooth.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Tooth number, used to name the transform file.
    #[serde(default = "default_tooth_index")]
    pub tooth_index: u32,

    /// Sample whose downsampled points seed the reference (default: 0U).
    #[serde(default = "default_reference_tag")]
    pub reference_tag: Tag,

    /// Directory of `{tag}.txt` point files for this tooth.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving aligned shapes and test reconstructions.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Transform JSON path (default: `{output_dir}/transforms_{tooth}.json`).
    #[serde(default)]
    pub transforms_path: Option<PathBuf>,

    /// Points kept in the initial reference (default: 1500).
    #[serde(default = "default_reference_points")]
    pub reference_points: usize,

    /// Upper bound on points per sample (default: 3000).
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Principal modes used for reconstruction (default: 60).
    #[serde(default = "default_components")]
    pub components: usize,

    /// Worker threads; 0 picks one per core.
    #[serde(default)]
    pub workers: usize,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub alignment: AlignmentConfig,
}

/// Which tags form the training set.
#[derive(Clone, Debug, Deserialize)]
pub struct TrainingConfig {
    /// First patient index, inclusive (default: 0).
    #[serde(default)]
    pub first_index: u32,

    /// Last patient index, inclusive (default: 129).
    #[serde(default = "default_last_index")]
    pub last_index: u32,

    /// Arches included (default: both).
    #[serde(default = "default_arches")]
    pub arches: Vec<Arch>,
}

/// Population and pair alignment parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct AlignmentConfig {
    /// Refine budget plus the finalize pass (default: 4).
    #[serde(default = "default_max_global_iterations")]
    pub max_global_iterations: u32,

    /// Relative reference change below which refinement stops (default: 0.01).
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// Rigid CPD iteration budget; deformable gets half (default: 100).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// CPD convergence tolerance (default: 1e-4).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Per-iteration registration events at debug level.
    #[serde(default)]
    pub verbose: bool,
}

// Default value functions
fn default_tooth_index() -> u32 {
    11
}
fn default_reference_tag() -> Tag {
    Tag::new(0, Arch::Upper)
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_reference_points() -> usize {
    1500
}
fn default_max_points() -> usize {
    3000
}
fn default_components() -> usize {
    60
}
fn default_last_index() -> u32 {
    129
}
fn default_arches() -> Vec<Arch> {
    vec![Arch::Upper, Arch::Lower]
}
fn default_max_global_iterations() -> u32 {
    4
}
fn default_eps() -> f64 {
    1e-2
}
fn default_max_iterations() -> u32 {
    100
}
fn default_tolerance() -> f64 {
    1e-4
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            first_index: 0,
            last_index: default_last_index(),
            arches: default_arches(),
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_global_iterations: default_max_global_iterations(),
            eps: default_eps(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            verbose: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tooth_index: default_tooth_index(),
            reference_tag: default_reference_tag(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            transforms_path: None,
            reference_points: default_reference_points(),
            max_points: default_max_points(),
            components: default_components(),
            workers: 0,
            training: TrainingConfig::default(),
            alignment: AlignmentConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would fail later in the run.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.reference_points > 0, "reference_points must be positive");
        ensure!(
            self.max_points >= self.reference_points,
            "max_points ({}) must be at least reference_points ({})",
            self.max_points,
            self.reference_points
        );
        ensure!(
            self.training.first_index <= self.training.last_index,
            "training.first_index must not exceed training.last_index"
        );
        ensure!(!self.training.arches.is_empty(), "training.arches must not be empty");
        ensure!(
            self.training_tags().contains(&self.reference_tag),
            "reference tag {} is not in the training set",
            self.reference_tag
        );
        self.population_params()
            .validate()
            .context("invalid [alignment] section")?;
        for params in [&self.pair_params().rigid, &self.pair_params().deformable] {
            params.validate().context("invalid [alignment] section")?;
        }
        Ok(())
    }

    /// Training tags described by `[training]`.
    pub fn training_tags(&self) -> std::collections::BTreeSet<Tag> {
        training_tags(
            self.training.first_index,
            self.training.last_index,
            &self.training.arches,
        )
    }

    /// Pair registration parameters.
    pub fn pair_params(&self) -> PairParams {
        PairParams::new(self.alignment.max_iterations, self.alignment.tolerance)
            .with_verbose(self.alignment.verbose)
    }

    /// Population loop parameters.
    pub fn population_params(&self) -> PopulationParams {
        PopulationParams::new()
            .with_max_global_iterations(self.alignment.max_global_iterations)
            .with_eps(self.alignment.eps)
    }

    /// Where the transform file goes.
    pub fn transforms_path(&self) -> PathBuf {
        self.transforms_path.clone().unwrap_or_else(|| {
            self.output_dir
                .join(format!("transforms_{}.json", self.tooth_index))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.reference_points, 1500);
        assert_eq!(config.max_points, 3000);
        assert_eq!(config.components, 60);
        assert_eq!(config.alignment.max_global_iterations, 4);
        assert_eq!(config.training_tags().len(), 260);
        assert_eq!(
            config.transforms_path(),
            PathBuf::from("output").join("transforms_11.json")
        );
    }

    #[test]
    fn test_partial_file() {
        let file = write_config(
            r#"
tooth_index = 21
reference_tag = "5L"
data_dir = "teeth/21"

[training]
last_index = 9
arches = ["L"]

[alignment]
eps = 0.05
"#,
        );
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.tooth_index, 21);
        assert_eq!(config.reference_tag, Tag::new(5, Arch::Lower));
        assert_eq!(config.training_tags().len(), 10);
        assert!((config.alignment.eps - 0.05).abs() < 1e-12);
        assert_eq!(config.alignment.max_iterations, 100);
    }

    #[test]
    fn test_reference_outside_training_rejected() {
        let file = write_config("reference_tag = \"200U\"\n");
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("200U"), "{err}");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.max_points = 10;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.alignment.max_global_iterations = 1;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.alignment.tolerance = -1.0;
        assert!(config.validate().is_err());
    }
}
