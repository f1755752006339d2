use anyhow::Context;
use radarcore::detection::{ThresholdPolicy, DEFAULT_THRESHOLD_DB};
use radarcore::sim::SceneConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// CFAR settings as they appear in the workflow file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CfarSettings {
    pub window: usize,
    pub guard: usize,
    /// "fixed" or "pfa".
    pub policy: String,
    pub threshold_db: f64,
    pub pfa: f64,
}

impl Default for CfarSettings {
    fn default() -> Self {
        Self {
            window: 8,
            guard: 2,
            policy: "fixed".into(),
            threshold_db: DEFAULT_THRESHOLD_DB,
            pfa: 1e-4,
        }
    }
}

impl CfarSettings {
    pub fn to_policy(&self) -> anyhow::Result<ThresholdPolicy> {
        match self.policy.as_str() {
            "fixed" => Ok(ThresholdPolicy::FixedOffset {
                default_db: self.threshold_db,
            }),
            "pfa" => Ok(ThresholdPolicy::PfaDerived { pfa: self.pfa }),
            other => anyhow::bail!("unknown threshold policy '{other}' (expected fixed or pfa)"),
        }
    }
}

/// Cognitive-loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveSettings {
    pub iterations: usize,
    pub seed: u64,
}

impl Default for CognitiveSettings {
    fn default() -> Self {
        Self {
            iterations: 10,
            seed: 0,
        }
    }
}

/// Full pipeline configuration loadable from YAML.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    pub scene: SceneConfig,
    pub echo_seed: u64,
    pub cfar: CfarSettings,
    pub cognitive: CognitiveSettings,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }
}
