use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ============================================================
// Analysis Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Percentage of a bucket's traffic above which problematic statuses are suspicious.
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
    /// Expected fraction of outliers among flagged problematic records.
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 5.0,
            contamination: 0.1,
            random_seed: 42,
            n_estimators: 100,
            max_samples: 256,
        }
    }
}

fn default_threshold_percent() -> f64 {
    5.0
}

fn default_contamination() -> f64 {
    0.1
}

fn default_random_seed() -> u64 {
    42
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

// ============================================================
// Input Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_true")]
    pub normalize_time_labels: bool,
    #[serde(default)]
    pub fill_missing_minutes: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            normalize_time_labels: true,
            fill_missing_minutes: false,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================
// Output Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ReportFormat,
    /// Directory for chart input CSVs. Nothing is exported when unset.
    pub chart_dir: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let analysis = &self.analysis;
        if !(0.0..=100.0).contains(&analysis.threshold_percent) {
            return Err(eyre::eyre!(
                "threshold_percent must be between 0 and 100, got {}",
                analysis.threshold_percent
            ));
        }
        if !(analysis.contamination > 0.0 && analysis.contamination <= 0.5) {
            return Err(eyre::eyre!(
                "contamination must be in (0, 0.5], got {}",
                analysis.contamination
            ));
        }
        if analysis.n_estimators == 0 {
            return Err(eyre::eyre!("n_estimators must be at least 1"));
        }
        if analysis.max_samples == 0 {
            return Err(eyre::eyre!("max_samples must be at least 1"));
        }
        Ok(())
    }
}
