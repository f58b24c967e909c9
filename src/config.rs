use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::Result;
use regex::Regex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    pub gateway_config: GatewayConfig,
    #[serde(default)]
    pub agents: AgentRegistry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Number of zones the feeder dashboard counts against.
    #[serde(default = "default_total_zones")]
    pub total_zones: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12393
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_total_zones() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Pinned session id; a fresh one is generated per request when unset.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint_path() -> String {
    "/api/agent".to_string()
}

fn default_user_id() -> String {
    "catcare-web".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl GatewayConfig {
    pub fn endpoint_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.endpoint_path.starts_with('/') {
            format!("{}{}", base, self.endpoint_path)
        } else {
            format!("{}/{}", base, self.endpoint_path)
        }
    }
}

/// Logical capabilities the dashboards ask agents for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Coverage,
    Orchestrator,
    MedicalTriage,
    SupplyMatching,
    PatternForecasting,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Coverage,
        Capability::Orchestrator,
        Capability::MedicalTriage,
        Capability::SupplyMatching,
        Capability::PatternForecasting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Coverage => "coverage",
            Capability::Orchestrator => "orchestrator",
            Capability::MedicalTriage => "medical_triage",
            Capability::SupplyMatching => "supply_matching",
            Capability::PatternForecasting => "pattern_forecasting",
        }
    }
}

/// Maps each capability to the remote agent identifier serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistry {
    #[serde(default = "default_coverage_agent")]
    pub coverage: String,
    #[serde(default = "default_orchestrator_agent")]
    pub orchestrator: String,
    #[serde(default = "default_medical_triage_agent")]
    pub medical_triage: String,
    #[serde(default = "default_supply_matching_agent")]
    pub supply_matching: String,
    #[serde(default = "default_pattern_forecasting_agent")]
    pub pattern_forecasting: String,
}

fn default_coverage_agent() -> String {
    "69830c5851b9f371d4d6a6c1".to_string()
}

fn default_orchestrator_agent() -> String {
    "69830ce5710a251ef6c8a621".to_string()
}

fn default_medical_triage_agent() -> String {
    "69830c8b29c2f18838004b05".to_string()
}

fn default_supply_matching_agent() -> String {
    "69830ca651b9f371d4d6a6c2".to_string()
}

fn default_pattern_forecasting_agent() -> String {
    "69830cc229c2f18838004b09".to_string()
}

impl AgentRegistry {
    pub fn agent_id(&self, capability: Capability) -> &str {
        match capability {
            Capability::Coverage => &self.coverage,
            Capability::Orchestrator => &self.orchestrator,
            Capability::MedicalTriage => &self.medical_triage,
            Capability::SupplyMatching => &self.supply_matching,
            Capability::PatternForecasting => &self.pattern_forecasting,
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self {
            coverage: default_coverage_agent(),
            orchestrator: default_orchestrator_agent(),
            medical_triage: default_medical_triage_agent(),
            supply_matching: default_supply_matching_agent(),
            pattern_forecasting: default_pattern_forecasting_agent(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            total_zones: default_total_zones(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            anyhow::bail!("Configuration file not found: {}", path);
        }

        let content = substitute_env_vars(&load_text_file(path)?);

        let path_lower = path.to_lowercase();
        let mut config: Config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        if let Ok(url) = std::env::var("AGENT_GATEWAY_URL") {
            if !url.trim().is_empty() {
                config.gateway_config.base_url = url;
            }
        }
        // Unset ${VAR} placeholders and blanks mean no key.
        if let Some(key) = &config.gateway_config.api_key {
            if key.trim().is_empty() || key.contains("${") {
                config.gateway_config.api_key = None;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let base_url = self.gateway_config.base_url.trim();
        if base_url.is_empty() || base_url.contains("${") {
            anyhow::bail!("gateway_config.base_url is not set");
        }
        if self.gateway_config.timeout_secs == 0 {
            anyhow::bail!("gateway_config.timeout_secs must be positive");
        }
        for capability in Capability::ALL {
            if self.agents.agent_id(capability).trim().is_empty() {
                anyhow::bail!("agents.{} is empty", capability.as_str());
            }
        }
        Ok(())
    }
}

/// Replace `${VAR}` with the value of the environment variable, leaving unknown
/// variables untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let pattern = match Regex::new(r"\$\{(\w+)\}") {
        Ok(p) => p,
        Err(_) => return content.to_string(),
    };
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Read a text file, honouring a UTF-8/UTF-16 byte order mark when present.
fn load_text_file(path: &str) -> Result<String> {
    let bytes = fs::read(path)?;
    let (cow, _, had_errors) = encoding_rs::UTF_8.decode(&bytes);
    if had_errors {
        tracing::warn!("Configuration file {} contained invalid UTF-8 sequences", path);
    }
    Ok(cow.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    // AGENT_GATEWAY_URL is process-wide; loads must not overlap with a test setting it.
    static GATEWAY_URL_ENV: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        GATEWAY_URL_ENV.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(path: &str) -> Result<Config> {
        let _guard = env_lock();
        Config::load(path)
    }

    fn write_config(name: &str, content: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path.to_str().unwrap().to_string())
    }

    #[test]
    fn loads_yaml_with_registry_defaults() {
        let (_dir, path) = write_config(
            "conf.yaml",
            "gateway_config:\n  base_url: http://agents.local\nagents:\n  coverage: cov-1\n",
        );
        let config = load(&path).unwrap();
        assert_eq!(config.agents.agent_id(Capability::Coverage), "cov-1");
        assert_eq!(
            config.agents.agent_id(Capability::MedicalTriage),
            "69830c8b29c2f18838004b05"
        );
        assert_eq!(config.system_config.port, 12393);
        assert_eq!(config.gateway_config.timeout_secs, 60);
        assert_eq!(config.gateway_config.endpoint_url(), "http://agents.local/api/agent");
    }

    #[test]
    fn loads_json_with_bom() {
        let (_dir, path) = write_config(
            "conf.json",
            "\u{feff}{\"gateway_config\": {\"base_url\": \"http://x/\", \"endpoint_path\": \"run\"}}",
        );
        let config = load(&path).unwrap();
        assert_eq!(config.gateway_config.endpoint_url(), "http://x/run");
    }

    #[test]
    fn substitutes_known_env_vars_only() {
        std::env::set_var("CATCARE_TEST_KEY", "secret");
        let out = substitute_env_vars("key: ${CATCARE_TEST_KEY} other: ${CATCARE_UNSET_VAR_XYZ}");
        assert_eq!(out, "key: secret other: ${CATCARE_UNSET_VAR_XYZ}");
    }

    #[test]
    fn rejects_unresolved_base_url() {
        let (_dir, path) = write_config(
            "conf.yaml",
            "gateway_config:\n  base_url: ${CATCARE_UNSET_BASE_URL_XYZ}\n",
        );
        assert!(load(&path).is_err());
    }

    #[test]
    fn unresolved_api_key_means_no_key() {
        let (_dir, path) = write_config(
            "conf.yaml",
            "gateway_config:\n  base_url: http://agents.local\n  api_key: ${CATCARE_UNSET_KEY_XYZ}\n",
        );
        assert_eq!(load(&path).unwrap().gateway_config.api_key, None);
    }

    #[test]
    fn gateway_url_env_overrides_file() {
        let (_dir, path) = write_config(
            "conf.yaml",
            "gateway_config:\n  base_url: ${CATCARE_UNSET_BASE_URL_XYZ}\n",
        );
        let _guard = env_lock();
        std::env::set_var("AGENT_GATEWAY_URL", "http://override.local");
        let loaded = Config::load(&path);
        std::env::remove_var("AGENT_GATEWAY_URL");

        let config = loaded.unwrap();
        assert_eq!(config.gateway_config.base_url, "http://override.local");
        assert_eq!(config.gateway_config.endpoint_url(), "http://override.local/api/agent");
    }

    #[test]
    fn rejects_missing_file() {
        assert!(load("/nonexistent/catcare.yaml").is_err());
    }
}
