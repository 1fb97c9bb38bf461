use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Analysis Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Hard ceiling on transactions per run; larger inputs are rejected.
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    #[serde(default)]
    pub cycles: CycleConfig,
    #[serde(default)]
    pub smurfing: SmurfingConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub legitimacy: LegitimacyConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_transactions: default_max_transactions(),
            cycles: CycleConfig::default(),
            smurfing: SmurfingConfig::default(),
            shell: ShellConfig::default(),
            legitimacy: LegitimacyConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

fn default_max_transactions() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CycleConfig {
    #[serde(default = "default_min_cycle_len")]
    pub min_len: usize,
    #[serde(default = "default_max_cycle_len")]
    pub max_len: usize,
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    /// Simple cycles recorded before the search stops early.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

impl CycleConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 5,
            time_budget_ms: 5000,
            max_cycles: default_max_cycles(),
        }
    }
}

fn default_min_cycle_len() -> usize {
    3
}

fn default_max_cycle_len() -> usize {
    5
}

fn default_time_budget_ms() -> u64 {
    5000
}

fn default_max_cycles() -> usize {
    20_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmurfingConfig {
    #[serde(default = "default_fan_threshold")]
    pub fan_threshold: usize,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            fan_threshold: 10,
            window_hours: 72,
        }
    }
}

fn default_fan_threshold() -> usize {
    10
}

fn default_window_hours() -> i64 {
    72
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShellConfig {
    /// Accounts with `in_degree + out_degree` at or below this are shell candidates.
    #[serde(default = "default_max_shell_degree")]
    pub max_shell_degree: usize,
    #[serde(default = "default_min_shell_hops")]
    pub min_shell_hops: usize,
    /// Depth bound on a single chain walk, counted in shell intermediates.
    #[serde(default = "default_max_chain_hops")]
    pub max_chain_hops: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_shell_degree: 3,
            min_shell_hops: 3,
            max_chain_hops: 8,
        }
    }
}

fn default_max_shell_degree() -> usize {
    3
}

fn default_min_shell_hops() -> usize {
    3
}

fn default_max_chain_hops() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct LegitimacyConfig {
    /// Degree for the pure merchant sink / pure payroll source rules.
    #[serde(default = "default_bulk_degree")]
    pub bulk_degree: usize,
    /// Degree for the statistical merchant / payroll traps.
    #[serde(default = "default_trap_degree")]
    pub trap_degree: usize,
    #[serde(default = "default_trap_unique_counterparties")]
    pub trap_unique_counterparties: usize,
    #[serde(default = "default_max_cv")]
    pub max_coefficient_of_variation: f64,
    #[serde(default = "default_penalty")]
    pub penalty: u32,
}

impl Default for LegitimacyConfig {
    fn default() -> Self {
        Self {
            bulk_degree: 100,
            trap_degree: 20,
            trap_unique_counterparties: 15,
            max_coefficient_of_variation: 0.3,
            penalty: 50,
        }
    }
}

fn default_bulk_degree() -> usize {
    100
}

fn default_trap_degree() -> usize {
    20
}

fn default_trap_unique_counterparties() -> usize {
    15
}

fn default_max_cv() -> f64 {
    0.3
}

fn default_penalty() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_cycle_weight")]
    pub cycle: u32,
    #[serde(default = "default_smurfing_weight")]
    pub smurfing: u32,
    #[serde(default = "default_shell_weight")]
    pub shell: u32,
    #[serde(default = "default_rapid_layering_weight")]
    pub rapid_layering: u32,
    #[serde(default = "default_velocity_24h_weight")]
    pub velocity_24h: u32,
    #[serde(default = "default_velocity_72h_weight")]
    pub velocity_72h: u32,
}

impl ScoringConfig {
    fn weights(&self) -> [(&'static str, u32); 6] {
        [
            ("cycle", self.cycle),
            ("smurfing", self.smurfing),
            ("shell", self.shell),
            ("rapid_layering", self.rapid_layering),
            ("velocity_24h", self.velocity_24h),
            ("velocity_72h", self.velocity_72h),
        ]
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cycle: 40,
            smurfing: 30,
            shell: 25,
            rapid_layering: 10,
            velocity_24h: 15,
            velocity_72h: 5,
        }
    }
}

fn default_cycle_weight() -> u32 {
    40
}

fn default_smurfing_weight() -> u32 {
    30
}

fn default_shell_weight() -> u32 {
    25
}

fn default_rapid_layering_weight() -> u32 {
    10
}

fn default_velocity_24h_weight() -> u32 {
    15
}

fn default_velocity_72h_weight() -> u32 {
    5
}

// ============================================================
// Ingest Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Rows read for a partial "glimpse" analysis of a large upload.
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { row_limit: 15_000 }
    }
}

fn default_row_limit() -> usize {
    15_000
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5500,
            host: "0.0.0.0".to_string(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    5500
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_body_bytes() -> usize {
    100 * 1024 * 1024
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

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> eyre::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        self.analysis.validate()?;
        if self.ingest.row_limit == 0 {
            return Err(eyre::eyre!("ingest.row_limit must be positive"));
        }
        Ok(())
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> eyre::Result<()> {
        let cycles = &self.cycles;
        if cycles.min_len < 3 {
            return Err(eyre::eyre!(
                "cycles.min_len must be at least 3, got {}",
                cycles.min_len
            ));
        }
        if cycles.min_len > cycles.max_len {
            return Err(eyre::eyre!(
                "cycles.min_len ({}) exceeds cycles.max_len ({})",
                cycles.min_len,
                cycles.max_len
            ));
        }
        if self.smurfing.fan_threshold < 2 {
            return Err(eyre::eyre!("smurfing.fan_threshold must be at least 2"));
        }
        if self.smurfing.window_hours <= 0 {
            return Err(eyre::eyre!("smurfing.window_hours must be positive"));
        }
        if self.shell.min_shell_hops == 0 || self.shell.max_chain_hops < self.shell.min_shell_hops {
            return Err(eyre::eyre!(
                "shell.max_chain_hops ({}) must be >= shell.min_shell_hops ({}) > 0",
                self.shell.max_chain_hops,
                self.shell.min_shell_hops
            ));
        }
        if cycles.max_cycles == 0 {
            return Err(eyre::eyre!("cycles.max_cycles must be positive"));
        }
        if self.max_transactions == 0 {
            return Err(eyre::eyre!("analysis.max_transactions must be positive"));
        }
        for (name, weight) in self.scoring.weights() {
            if weight > 100 {
                return Err(eyre::eyre!(
                    "scoring.{} must be at most 100, got {}",
                    name,
                    weight
                ));
            }
        }
        if self.legitimacy.penalty > 100 {
            return Err(eyre::eyre!("legitimacy.penalty must be at most 100"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[analysis]
max_transactions = 500

[analysis.cycles]
max_len = 4
time_budget_ms = 250

[analysis.smurfing]
fan_threshold = 6

[api]
port = 8080
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.analysis.max_transactions, 500);
        assert_eq!(config.analysis.cycles.min_len, 3); // default
        assert_eq!(config.analysis.cycles.max_len, 4);
        assert_eq!(config.analysis.cycles.time_budget(), Duration::from_millis(250));
        assert_eq!(config.analysis.smurfing.fan_threshold, 6);
        assert_eq!(config.analysis.smurfing.window_hours, 72); // default
        assert_eq!(config.analysis.scoring.cycle, 40); // default
        assert_eq!(config.ingest.row_limit, 15_000); // default
        assert_eq!(config.api.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.analysis.cycles.max_len, 5);
        assert_eq!(config.analysis.legitimacy.penalty, 50);
        assert_eq!(config.api.port, 5500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_inverted_cycle_bounds() {
        let mut config = Config::default();
        config.analysis.cycles.min_len = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_two_node_cycles_rejected() {
        let mut config = Config::default();
        config.analysis.cycles.min_len = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.analysis.smurfing.window_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../config.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.analysis.max_transactions, defaults.analysis.max_transactions);
        assert_eq!(config.analysis.shell.max_chain_hops, defaults.analysis.shell.max_chain_hops);
        assert_eq!(config.analysis.scoring.velocity_72h, defaults.analysis.scoring.velocity_72h);
        assert_eq!(config.api.max_body_bytes, defaults.api.max_body_bytes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_weight_above_cap() {
        let mut config = Config::default();
        config.analysis.scoring.shell = 4_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scoring.shell"));
    }

    #[test]
    fn test_validate_zero_cycle_cap() {
        let mut config = Config::default();
        config.analysis.cycles.max_cycles = 0;
        assert!(config.validate().is_err());
    }
}
