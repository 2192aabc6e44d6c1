// src/config.rs
//
// TOML job description for the `run` / `validate` commands, and the
// resolved copy written next to the outputs as config.json.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewError};
use crate::field::SliceAxis;
use crate::topology::BoundaryPolicy;
use crate::views::FieldViewKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub slice: SliceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub curves: Vec<CurveConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub omf: Vec<PathBuf>,
    #[serde(default)]
    pub odt: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceConfig {
    /// "x", "y" or "z"
    #[serde(default = "default_axis")]
    pub axis: String,
    /// Slice positions in metres. Empty means the middle of the mesh.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_views")]
    pub views: Vec<FieldViewKind>,
    #[serde(default)]
    pub png: bool,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurveConfig {
    pub x: String,
    pub y: String,
}

fn default_axis() -> String {
    "z".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from("views")
}

fn default_views() -> Vec<FieldViewKind> {
    FieldViewKind::ALL.to_vec()
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            axis: default_axis(),
            coordinates: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            views: default_views(),
            png: false,
            boundary: BoundaryPolicy::default(),
        }
    }
}

impl JobConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: JobConfig = toml::from_str(text)?;
        cfg.axis()?;
        if cfg.input.omf.is_empty() {
            return Err(ViewError::InvalidArgument(
                "input.omf must list at least one file".to_string(),
            ));
        }
        if !cfg.curves.is_empty() && cfg.input.odt.is_none() {
            return Err(ViewError::InvalidArgument(
                "curves need input.odt".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn axis(&self) -> Result<SliceAxis> {
        self.slice.axis.parse()
    }

    /// Input paths that do not exist on disk.
    pub fn missing_inputs(&self) -> Vec<&Path> {
        self.input
            .omf
            .iter()
            .chain(self.input.odt.iter())
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<JobConfig> {
    let text = fs::read_to_string(path)?;
    JobConfig::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_sections() {
        let cfg = JobConfig::from_toml_str("[input]\nomf = [\"a.omf\"]\n").unwrap();
        assert_eq!(cfg.axis().unwrap(), SliceAxis::Z);
        assert!(cfg.slice.coordinates.is_empty());
        assert_eq!(cfg.output.directory, PathBuf::from("views"));
        assert_eq!(cfg.output.views.len(), 4);
        assert!(!cfg.output.png);
        assert_eq!(cfg.output.boundary, BoundaryPolicy::Zero);
        assert!(cfg.curves.is_empty());
    }

    #[test]
    fn full_job_parses() {
        let cfg = JobConfig::from_toml_str(
            r#"
[input]
omf = ["run/a.omf", "run/b.omf"]
odt = "run/sim.odt"

[slice]
axis = "y"
coordinates = [1.0e-9, 2.0e-9]

[output]
directory = "out"
views = ["density", "angle"]
png = true
boundary = "periodic"

[[curves]]
x = "iteration"
y = "E"
"#,
        )
        .unwrap();
        assert_eq!(cfg.axis().unwrap(), SliceAxis::Y);
        assert_eq!(cfg.output.views, vec![FieldViewKind::Density, FieldViewKind::Angle]);
        assert_eq!(cfg.output.boundary, BoundaryPolicy::Periodic);
        assert_eq!(cfg.curves[0].y, "E");
        assert_eq!(cfg.missing_inputs().len(), 3);
    }

    #[test]
    fn bad_axis_is_rejected_with_fixed_message() {
        let err = JobConfig::from_toml_str("[input]\nomf = [\"a.omf\"]\n[slice]\naxis = \"w\"\n").unwrap_err();
        assert_eq!(err.to_string(), "Slice Axis must be one of 'x', 'y' ,'z'");
    }

    #[test]
    fn curves_without_odt_are_rejected() {
        let err = JobConfig::from_toml_str("[input]\nomf = [\"a.omf\"]\n[[curves]]\nx = \"a\"\ny = \"b\"\n");
        assert!(matches!(err, Err(ViewError::InvalidArgument(_))));
    }

    #[test]
    fn resolved_config_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = JobConfig::from_toml_str("[input]\nomf = [\"a.omf\"]\n").unwrap();
        cfg.write_to_dir(dir.path()).unwrap();
        let text = fs::read_to_string(dir.path().join("config.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["slice"]["axis"], "z");
        assert_eq!(v["output"]["boundary"], "zero");
        assert_eq!(v["output"]["views"][0], "inplane");
    }
}
