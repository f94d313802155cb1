use std::collections::HashMap;
use std::path::{Path, PathBuf};

use snafu::{ensure, ResultExt};

use crate::common::{ConfigLoadSnafu, ConfigSnafu, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DOTENV_PATH: &str = ".env";
const ENV_PREFIX: &str = "EDGEAPI";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Flag,
    Environment,
    DotEnv,
    File,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CredentialSource::Flag => "CLI flag",
            CredentialSource::Environment => "environment variable",
            CredentialSource::DotEnv => ".env file",
            CredentialSource::File => "config file",
        })
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub debug: bool,
    pub output: Option<OutputFormat>,
}

#[derive(Clone, serde::Deserialize)]
pub struct Config {
    pub api_url: url::Url,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default)]
    pub output: OutputFormat,

    #[serde(skip)]
    pub credential_source: Option<CredentialSource>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn api_key_in(vars: &HashMap<String, String>) -> Option<String> {
    non_empty(vars.get("API_KEY"))
        .or_else(|| non_empty(vars.get(&format!("{ENV_PREFIX}_API_KEY"))))
}

/// Read `KEY=value` pairs from a dotenv file. A missing file reads as empty.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => return Ok(HashMap::new()),
        Err(err) => {
            return ConfigSnafu {
                message: format!("Failed to read {}: {err}", path.display()),
            }
            .fail()
        }
    };

    entries
        .map(|entry| {
            entry.map_err(|err| {
                ConfigSnafu {
                    message: format!("Invalid line in {}: {err}", path.display()),
                }
                .build()
            })
        })
        .collect()
}

impl Config {
    /// Layers, lowest first: YAML file, `.env` entries, process environment
    /// (`EDGEAPI_*`, then the legacy `API_KEY` / `DEBUG` / `OUTPUT_JSON`),
    /// then `overrides`.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let dotenv = read_dotenv(Path::new(DOTENV_PATH))?;
        Self::load_with_env(overrides, std::env::vars().collect(), dotenv)
    }

    pub fn load_with_env(
        overrides: &Overrides,
        env: HashMap<String, String>,
        dotenv: HashMap<String, String>,
    ) -> Result<Self> {
        let path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let flag_key = non_empty(overrides.api_key.as_ref());
        let env_key = api_key_in(&env);
        let dotenv_key = api_key_in(&dotenv);

        // Real variables shadow .env entries.
        let vars: HashMap<String, String> = dotenv.into_iter().chain(env).collect();
        let legacy_key = non_empty(vars.get("API_KEY"));
        let legacy_debug = vars.get("DEBUG").is_some_and(|v| v == "true");
        let legacy_json = vars.get("OUTPUT_JSON").is_some_and(|v| v == "true");

        let mut config: Config = ::config::Config::builder()
            .add_source(
                ::config::File::new(&path.to_string_lossy(), ::config::FileFormat::Yaml)
                    .required(overrides.config_path.is_some()),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .source(Some(vars))
                    .try_parsing(true),
            )
            .set_override_option("api_key", legacy_key)
            .and_then(|b| b.set_override_option("debug_mode", legacy_debug.then_some(true)))
            .and_then(|b| b.set_override_option("output", legacy_json.then_some("json")))
            .and_then(|b| b.set_override_option("api_key", flag_key.clone()))
            .and_then(|b| b.set_override_option("debug_mode", overrides.debug.then_some(true)))
            .and_then(|b| {
                b.set_override_option("output", overrides.output.map(|o| o.as_str()))
            })
            .context(ConfigLoadSnafu)?
            .build()
            .context(ConfigLoadSnafu)?
            .try_deserialize()
            .context(ConfigLoadSnafu)?;

        ensure!(
            matches!(config.api_url.scheme(), "http" | "https"),
            ConfigSnafu {
                message: format!("api_url must be an http(s) URL, got {}", config.api_url),
            }
        );

        config.api_key = non_empty(config.api_key.as_ref());
        config.credential_source = match (&config.api_key, flag_key, env_key, dotenv_key) {
            (None, ..) => None,
            (Some(_), Some(_), ..) => Some(CredentialSource::Flag),
            (Some(_), None, Some(_), _) => Some(CredentialSource::Environment),
            (Some(_), None, None, Some(_)) => Some(CredentialSource::DotEnv),
            (Some(_), None, None, None) => Some(CredentialSource::File),
        };

        tracing::debug!(
            path = %path.display(),
            api_url = %config.api_url,
            debug = config.debug_mode,
            output = config.output.as_str(),
            "Configuration loaded"
        );

        Ok(config)
    }
}
