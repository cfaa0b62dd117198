//! TOML pipeline configuration.
//!
//! ```toml
//! [bilateral]
//! domain_sigma = [2.0, 2.0]   # or a single value for every axis
//! domain_mu = 2.5
//! range_sigma = 30.0
//! range_samples = 100
//!
//! [execution]
//! threads = 0                 # 0 = hardware concurrency
//! report_progress = true
//! ```

use crate::core::error::{PipelineError, PipelineResult};
use crate::execution::{ExecutionOptions, ProgressUpdate};
use crate::filters::bilateral::{
    BilateralImageFilter, DEFAULT_DOMAIN_MU, DEFAULT_DOMAIN_SIGMA, DEFAULT_RANGE_SAMPLES,
    DEFAULT_RANGE_SIGMA,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Domain sigma given either once for all axes or per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SigmaSetting {
    Uniform(f64),
    PerAxis(Vec<f64>),
}

impl Default for SigmaSetting {
    fn default() -> Self {
        SigmaSetting::Uniform(DEFAULT_DOMAIN_SIGMA)
    }
}

/// `[bilateral]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilateralConfig {
    pub domain_sigma: SigmaSetting,
    pub domain_mu: f64,
    pub range_sigma: f64,
    /// Leading axes to filter along. All axes when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_dimensionality: Option<usize>,
    pub range_samples: usize,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            domain_sigma: SigmaSetting::default(),
            domain_mu: DEFAULT_DOMAIN_MU,
            range_sigma: DEFAULT_RANGE_SIGMA,
            filter_dimensionality: None,
            range_samples: DEFAULT_RANGE_SAMPLES,
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub threads: usize,
    pub report_progress: bool,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub bilateral: BilateralConfig,
    pub execution: ExecutionConfig,
}

impl PipelineConfig {
    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse TOML config: {e}")))
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> PipelineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Push the `[bilateral]` section into a filter.
    ///
    /// Values go through the filter's validating setters, so the first
    /// invalid one is reported and the rest are not applied.
    pub fn apply_to<const D: usize>(&self, filter: &mut BilateralImageFilter<D>) -> PipelineResult<()> {
        let section = &self.bilateral;
        match &section.domain_sigma {
            SigmaSetting::Uniform(sigma) => filter.set_domain_sigma_all(*sigma)?,
            SigmaSetting::PerAxis(values) if values.len() == 1 => {
                filter.set_domain_sigma_all(values[0])?
            }
            SigmaSetting::PerAxis(values) => {
                let sigma: [f64; D] = values.as_slice().try_into().map_err(|_| {
                    PipelineError::parameter(
                        "domain_sigma",
                        format!("expected 1 or {} values, got {}", D, values.len()),
                    )
                })?;
                filter.set_domain_sigma(sigma)?;
            }
        }
        filter.set_domain_mu(section.domain_mu)?;
        filter.set_range_sigma(section.range_sigma)?;
        filter.set_range_samples(section.range_samples)?;
        filter.set_filter_dimensionality(section.filter_dimensionality.unwrap_or(D))?;
        Ok(())
    }

    /// Engine options for the `[execution]` section.
    pub fn execution_options(&self) -> ExecutionOptions {
        let options = ExecutionOptions::new().with_threads(self.execution.threads);
        if self.execution.report_progress {
            options.with_progress(log_progress)
        } else {
            options
        }
    }
}

fn log_progress(update: ProgressUpdate) {
    match update {
        ProgressUpdate::NodeStarted { node_name, region, .. } => {
            info!("running {} over {}", node_name, region)
        }
        ProgressUpdate::NodeCompleted {
            node_id,
            duration_ms,
            pixels,
        } => info!("{} produced {} pixels in {} ms", node_id, pixels, duration_ms),
        ProgressUpdate::NodeSkipped { node_id, .. } => info!("{} is up to date", node_id),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_filter_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());

        let mut filter = BilateralImageFilter::<2>::new();
        config.apply_to(&mut filter).unwrap();
        assert_eq!(filter.domain_sigma(), [4.0, 4.0]);
        assert_eq!(filter.range_sigma(), 50.0);
        assert_eq!(filter.filter_dimensionality(), 2);
    }

    #[test]
    fn test_per_axis_sigma() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [bilateral]
            domain_sigma = [1.5, 3.0, 0.5]
            range_sigma = 12.0
            filter_dimensionality = 2

            [execution]
            threads = 2
            "#,
        )
        .unwrap();

        let mut filter = BilateralImageFilter::<3>::new();
        config.apply_to(&mut filter).unwrap();
        assert_eq!(filter.domain_sigma(), [1.5, 3.0, 0.5]);
        assert_eq!(filter.range_sigma(), 12.0);
        assert_eq!(filter.filter_dimensionality(), 2);
        assert_eq!(config.execution_options().threads, 2);
        assert!(config.execution_options().progress_callback.is_none());
    }

    #[test]
    fn test_scalar_sigma() {
        let config = PipelineConfig::from_toml_str("[bilateral]\ndomain_sigma = 2.0\n").unwrap();
        assert_eq!(config.bilateral.domain_sigma, SigmaSetting::Uniform(2.0));

        let mut filter = BilateralImageFilter::<2>::new();
        config.apply_to(&mut filter).unwrap();
        assert_eq!(filter.domain_sigma(), [2.0, 2.0]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = PipelineConfig::from_toml_str("[bilateral]\ndomain_sigma = [1.0, 2.0, 3.0]\n").unwrap();
        let mut filter = BilateralImageFilter::<2>::new();
        assert!(matches!(
            config.apply_to(&mut filter),
            Err(PipelineError::Parameter { .. })
        ));

        let config = PipelineConfig::from_toml_str("[bilateral]\nrange_sigma = -1.0\n").unwrap();
        assert!(config.apply_to(&mut filter).is_err());
        assert_eq!(filter.range_sigma(), 50.0);

        assert!(matches!(
            PipelineConfig::from_toml_str("[bilateral\n"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::default();
        config.bilateral.domain_sigma = SigmaSetting::PerAxis(vec![1.0, 2.0]);
        config.execution.report_progress = true;

        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
        assert!(config.execution_options().progress_callback.is_some());
    }
}
