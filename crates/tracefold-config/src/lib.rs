use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment keys
// ─────────────────────────────────────────────────────────────────────────────

pub const CONFIG_PATH_VAR: &str = "TRACEFOLD_CONFIG";
pub const BIND_ADDR_VAR: &str = "TRACEFOLD_BIND_ADDR";
pub const DEFAULT_REGION_VAR: &str = "TRACEFOLD_DEFAULT_REGION";
pub const REGIONS_VAR: &str = "TRACEFOLD_REGIONS";
pub const COMPLETION_VAR: &str = "TRACEFOLD_COMPLETION";

const DEFAULT_REGIONS: [&str; 16] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "sa-east-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
];

// ─────────────────────────────────────────────────────────────────────────────
// Config Structs
// ─────────────────────────────────────────────────────────────────────────────

/// Which segment state marks a trace as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRule {
    #[default]
    LastSegment,
    AllSegments,
}

impl CompletionRule {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "last_segment" => Some(CompletionRule::LastSegment),
            "all_segments" => Some(CompletionRule::AllSegments),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_region")]
    pub default_region: String,
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
    #[serde(default)]
    pub completion: CompletionRule,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

fn default_region() -> String {
    "us-east-1".into()
}

fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_region: default_region(),
            regions: default_regions(),
            completion: CompletionRule::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads from `TRACEFOLD_CONFIG` if set, then applies env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let base = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        let config = base.with_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a key lookup (normally the process env).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = lookup(BIND_ADDR_VAR) {
            self.bind_addr = addr;
        }
        if let Some(region) = lookup(DEFAULT_REGION_VAR) {
            self.default_region = region;
        }
        if let Some(regions) = lookup(REGIONS_VAR) {
            self.regions = regions
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(rule) = lookup(COMPLETION_VAR) {
            self.completion = CompletionRule::parse(&rule)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown completion rule: {rule}")))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::Invalid("no regions configured".into()));
        }
        if !self.regions.contains(&self.default_region) {
            return Err(ConfigError::Invalid(format!(
                "default region {} is not in the region list",
                self.default_region
            )));
        }
        Ok(())
    }
}
