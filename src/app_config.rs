//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use family_cloud_core::api::{
    ApiConfig, CONNECT_TIMEOUT_SECS, DEFAULT_API_BASE_URL, DEFAULT_BASE_DELAY,
    DEFAULT_MAX_RETRIES, READ_TIMEOUT_SECS, RetryPolicy,
};
use family_cloud_core::auth::{
    DEFAULT_CLIENT_ID, DEFAULT_COGNITO_DOMAIN, DEFAULT_REDIRECT_URI, HostedUi,
};

const APP_DIR: &str = "family-cloud";
const DB_FILE: &str = "family-cloud.db";

const ENV_API_BASE_URL: &str = "FAMILY_CLOUD_API_BASE_URL";
const ENV_COGNITO_DOMAIN: &str = "FAMILY_CLOUD_COGNITO_DOMAIN";
const ENV_CLIENT_ID: &str = "FAMILY_CLOUD_CLIENT_ID";
const ENV_REDIRECT_URI: &str = "FAMILY_CLOUD_REDIRECT_URI";
const ENV_STORAGE_PATH: &str = "FAMILY_CLOUD_STORAGE_PATH";

/// File configuration for CLI defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// API base URL.
    pub api_base_url: Option<String>,
    /// Hosted sign-in domain.
    pub cognito_domain: Option<String>,
    /// Hosted sign-in app client id.
    pub client_id: Option<String>,
    /// Where the hosted UI sends the browser after sign-in.
    pub redirect_uri: Option<String>,
    /// SQLite file holding local state.
    pub storage_path: Option<PathBuf>,
    /// Retries after the first attempt (0..=10).
    pub max_retries: Option<u32>,
    /// First retry delay in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// API connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// API request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 0..=10");
        }

        if let Some(delay) = self.retry_base_delay_ms
            && !(1..=60_000).contains(&delay)
        {
            bail!(
                "Invalid config value for `retry_base_delay_ms`: {delay}. Expected range: 1..=60000"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_http_url("api_base_url", self.api_base_url.as_deref())?;
        validate_http_url("redirect_uri", self.redirect_uri.as_deref())?;

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_http_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }

    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    fn file(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Values given on the command line; they beat every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub storage_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiConfig,
    pub hosted_ui: HostedUi,
    pub storage_path: PathBuf,
    pub verbosity: Option<VerbositySetting>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/family-cloud/config.toml`
/// 2. `$HOME/.config/family-cloud/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

/// Resolves the default database path.
///
/// Priority:
/// 1. `$XDG_DATA_HOME/family-cloud/family-cloud.db`
/// 2. `$HOME/.local/share/family-cloud/family-cloud.db`
/// 3. `./family-cloud.db`
#[must_use]
pub fn resolve_default_storage_path() -> PathBuf {
    if let Some(data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR).join(DB_FILE);
    }
    match env_var_non_empty_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join(DB_FILE),
        None => PathBuf::from(DB_FILE),
    }
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn env_var_non_empty(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Loads config from `explicit` when given (it must exist), else from the
/// default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
            loaded_from_file: true,
        });
    }
    load_default_file_config()
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

/// Merges CLI values, environment, config file and built-in defaults, in
/// that order of precedence.
pub fn resolve_settings(loaded: &LoadedConfig, cli: &CliOverrides) -> Result<Settings> {
    resolve_settings_with(loaded, cli, env_var_non_empty)
}

fn resolve_settings_with<E>(loaded: &LoadedConfig, cli: &CliOverrides, env: E) -> Result<Settings>
where
    E: Fn(&str) -> Option<String>,
{
    let file = loaded.file();

    let api_base_url = cli
        .api_base_url
        .clone()
        .or_else(|| env(ENV_API_BASE_URL))
        .or(file.api_base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let cognito_domain = env(ENV_COGNITO_DOMAIN)
        .or(file.cognito_domain)
        .unwrap_or_else(|| DEFAULT_COGNITO_DOMAIN.to_string());
    let client_id = env(ENV_CLIENT_ID)
        .or(file.client_id)
        .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());
    let redirect_uri = env(ENV_REDIRECT_URI)
        .or(file.redirect_uri)
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
    let storage_path = cli
        .storage_path
        .clone()
        .or_else(|| env(ENV_STORAGE_PATH).map(PathBuf::from))
        .or(file.storage_path)
        .unwrap_or_else(resolve_default_storage_path);

    let retry = RetryPolicy::new(
        file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        file.retry_base_delay_ms
            .map_or(DEFAULT_BASE_DELAY, Duration::from_millis),
    );
    let api = ApiConfig {
        base_url: api_base_url,
        retry,
        connect_timeout: Duration::from_secs(
            file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        ),
        read_timeout: Duration::from_secs(file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS)),
    };

    let hosted_ui = HostedUi::new(cognito_domain, client_id, redirect_uri)
        .context("Invalid hosted sign-in settings")?;

    Ok(Settings {
        api,
        hosted_ui,
        storage_path,
        verbosity: file.verbosity,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "api_base_url" => cfg.api_base_url = Some(parse_string_field(key, value, line_number)?),
            "cognito_domain" => {
                cfg.cognito_domain = Some(parse_string_field(key, value, line_number)?);
            }
            "client_id" => cfg.client_id = Some(parse_string_field(key, value, line_number)?),
            "redirect_uri" => cfg.redirect_uri = Some(parse_string_field(key, value, line_number)?),
            "storage_path" => {
                let path = parse_string_field(key, value, line_number)?;
                cfg.storage_path = Some(PathBuf::from(path));
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `max_retries` value on line {line_number}"))?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))?;
                cfg.max_retries = Some(n);
            }
            "retry_base_delay_ms" | "connect_timeout_secs" | "read_timeout_secs" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `{key}` value on line {line_number}"))?;
                match key {
                    "retry_base_delay_ms" => cfg.retry_base_delay_ms = Some(parsed),
                    "connect_timeout_secs" => cfg.connect_timeout_secs = Some(parsed),
                    _ => cfg.read_timeout_secs = Some(parsed),
                }
            }
            "verbosity" => {
                let parsed = parse_string_field(key, value, line_number)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_string_field(key: &str, value: &str, line_number: usize) -> Result<String> {
    parse_string_literal(value)
        .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(config: Option<FileConfig>) -> LoadedConfig {
        LoadedConfig {
            path: None,
            loaded_from_file: config.is_some(),
            config,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
max_retries = 5
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.api_base_url.is_none());
    }

    #[test]
    fn test_parse_config_all_string_fields() {
        let cfg = parse_config_str(
            r#"
api_base_url = "http://localhost:3000/dev"
cognito_domain = "auth.example.com"
client_id = "abc123"
redirect_uri = "http://localhost:5173"
storage_path = "/tmp/fc.db"
"#,
        )
        .expect("string fields should parse");
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://localhost:3000/dev"));
        assert_eq!(cfg.cognito_domain.as_deref(), Some("auth.example.com"));
        assert_eq!(cfg.client_id.as_deref(), Some("abc123"));
        assert_eq!(cfg.redirect_uri.as_deref(), Some("http://localhost:5173"));
        assert_eq!(cfg.storage_path, Some(PathBuf::from("/tmp/fc.db")));
    }

    #[test]
    fn test_parse_config_rejects_invalid_max_retries() {
        let err = parse_config_str("max_retries = 11").expect_err("invalid max_retries expected");
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_parse_config_rejects_zero_retry_delay() {
        let err = parse_config_str("retry_base_delay_ms = 0").expect_err("invalid delay expected");
        assert!(err.to_string().contains("retry_base_delay_ms"));
    }

    #[test]
    fn test_parse_config_rejects_timeout_out_of_range() {
        let err = parse_config_str("read_timeout_secs = 3601").expect_err("invalid timeout");
        assert!(err.to_string().contains("read_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_non_http_base_url() {
        let err = parse_config_str(r#"api_base_url = "ftp://x""#).expect_err("invalid url");
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("client_id = abc").expect_err("unquoted string");
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key");
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("max_retries = 4 trailing").expect_err("trailing token");
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r##"
max_retries = 2 # flaky wifi
client_id = "a#b" # hash inside quotes is kept
"##,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.max_retries, Some(2));
        assert_eq!(cfg.client_id.as_deref(), Some("a#b"));
    }

    #[test]
    fn test_verbosity_as_str_and_level() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Quiet.as_str(), "quiet");
        assert_eq!(VerbositySetting::Verbose.log_level(), "debug");
        assert_eq!(VerbositySetting::Debug.log_level(), "trace");
    }

    #[test]
    fn test_resolve_settings_defaults() {
        let settings = resolve_settings_with(&loaded(None), &CliOverrides::default(), no_env)
            .expect("defaults resolve");
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.api.retry.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(settings.hosted_ui.client_id(), DEFAULT_CLIENT_ID);
        assert!(settings.storage_path.ends_with(DB_FILE));
        assert_eq!(settings.verbosity, None);
    }

    #[test]
    fn test_resolve_settings_precedence_cli_env_file() {
        let file = FileConfig {
            api_base_url: Some("http://file".to_string()),
            client_id: Some("file-client".to_string()),
            storage_path: Some(PathBuf::from("/file.db")),
            max_retries: Some(1),
            ..FileConfig::default()
        };
        let env = |name: &str| match name {
            ENV_API_BASE_URL => Some("http://env".to_string()),
            ENV_STORAGE_PATH => Some("/env.db".to_string()),
            _ => None,
        };
        let cli = CliOverrides {
            storage_path: Some(PathBuf::from("/cli.db")),
            api_base_url: None,
        };

        let settings = resolve_settings_with(&loaded(Some(file)), &cli, env).expect("resolves");

        assert_eq!(settings.storage_path, PathBuf::from("/cli.db"));
        assert_eq!(settings.api.base_url, "http://env");
        assert_eq!(settings.hosted_ui.client_id(), "file-client");
        assert_eq!(settings.api.retry.max_retries(), 1);
    }

    #[test]
    fn test_resolve_settings_rejects_blank_hosted_ui_values() {
        let file = FileConfig {
            client_id: Some("  ".to_string()),
            ..FileConfig::default()
        };
        let result = resolve_settings_with(&loaded(Some(file)), &CliOverrides::default(), no_env);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_explicit_path_must_exist() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let missing = temp_dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());

        let present = temp_dir.path().join("config.toml");
        fs::write(&present, "verbosity = \"quiet\"\n").expect("write config");
        let loaded = load_config(Some(&present)).expect("config loads");
        assert!(loaded.loaded_from_file);
        assert_eq!(
            loaded.config.and_then(|config| config.verbosity),
            Some(VerbositySetting::Quiet)
        );
    }
}
