//! Daemon configuration
//!
//! Loaded in layers, later overriding earlier:
//! 1. Defaults on the core config structs
//! 2. TOML file at `TALENTMATCH_CONFIG` (default `~/.talentmatch/config.toml`), optional
//! 3. Environment, e.g. `TALENTMATCH__SCORER__REQUEST_TIMEOUT_MS=5000`

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use talentmatch_api_rpc::RpcServerConfig;
use talentmatch_core::config::EngineConfig;

const DEFAULT_CONFIG_PATH: &str = "~/.talentmatch/config.toml";
const ENV_PREFIX: &str = "TALENTMATCH";

/// Path of the optional config file
pub fn config_path() -> String {
    let raw = std::env::var("TALENTMATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    shellexpand::tilde(&raw).into_owned()
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Load and validate the engine configuration
pub fn load_engine_config() -> Result<EngineConfig> {
    load_from(&config_path(), env_source())
}

fn load_from(path: &str, env: Environment) -> Result<EngineConfig> {
    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(env)
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path))?;

    let mut engine: EngineConfig = settings
        .try_deserialize()
        .context("Invalid configuration")?;

    engine.scorer.command = shellexpand::tilde(&engine.scorer.command).into_owned();
    engine.scorer.working_dir = shellexpand::tilde(&engine.scorer.working_dir).into_owned();

    engine.validate()?;
    Ok(engine)
}

/// RPC bind address from `TALENTMATCH_RPC_HOST` / `TALENTMATCH_RPC_PORT`.
///
/// The host must be a loopback address; the server refuses anything else.
pub fn rpc_config() -> Result<RpcServerConfig> {
    let defaults = RpcServerConfig::default();

    let host = std::env::var("TALENTMATCH_RPC_HOST").unwrap_or(defaults.host);
    let port: u16 = std::env::var("TALENTMATCH_RPC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(defaults.port);

    let config = RpcServerConfig { host, port };
    config.bind_addr().map_err(anyhow::Error::msg)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    fn write_config(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("talentmatch-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_from("/nonexistent/talentmatch.toml", env(&[])).unwrap();

        assert_eq!(config.weights.unigram, 0.7);
        assert_eq!(config.scorer.request_timeout_ms, 30_000);
        assert_eq!(config.matching.max_limit, 50);
    }

    #[test]
    fn test_file_then_env_override() {
        let path = write_config(
            "override",
            r#"
[scorer]
command = "python3"
request_timeout_ms = 10000

[weights]
unigram = 0.6
bigram = 0.4
"#,
        );

        let config = load_from(
            &path,
            env(&[("TALENTMATCH__SCORER__REQUEST_TIMEOUT_MS", "5000")]),
        )
        .unwrap();

        assert_eq!(config.scorer.command, "python3");
        assert_eq!(config.scorer.request_timeout_ms, 5000);
        assert_eq!(config.weights.bigram, 0.4);
        // untouched sections keep defaults
        assert_eq!(config.lexicon.min_token_len, 3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_config(
            "invalid",
            r#"
[weights]
unigram = -1.0
"#,
        );

        assert!(load_from(&path, env(&[])).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_disable_scorer_from_env() {
        let config = load_from(
            "/nonexistent/talentmatch.toml",
            env(&[("TALENTMATCH__SCORER__ENABLED", "false")]),
        )
        .unwrap();

        assert!(!config.scorer.enabled);
    }

    #[test]
    fn test_extra_env_names_keep_case() {
        let path = write_config(
            "extra-env",
            r#"
[[scorer.extra_env]]
name = "PYTHONIOENCODING"
value = "utf-8"

[[scorer.extra_env]]
name = "HF_HOME"
value = "/models"
"#,
        );

        let config = load_from(&path, env(&[])).unwrap();

        let names: Vec<&str> = config
            .scorer
            .extra_env
            .iter()
            .map(|var| var.name.as_str())
            .collect();
        assert_eq!(names, vec!["PYTHONIOENCODING", "HF_HOME"]);
        assert_eq!(config.scorer.extra_env[1].value, "/models");
        std::fs::remove_file(path).ok();
    }
}
