//! Runner configuration.
//!
//! Stored as TOML, by default at `~/.config/planlink/planlink.toml`.
//! `--config` or `PLANLINK_CONFIG` point elsewhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use planlink::{AuthSettings, DownloadOptions, Endpoints, PassphraseSource, RetryPolicy};
use planlink_protocol::constants::{DEFAULT_API_BASE, DEFAULT_AUTH_URL, MAX_CHUNK_MB};
use planlink_protocol::is_resource_id;
use planlink_transfer::{validate_chunk_size_mb, validate_download_options, validate_target_id};
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "PLANLINK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub workspace_id: String,
    pub model_id: String,

    /// Upload chunk size in MiB (1 to 50).
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: u32,

    /// Submission attempts per action.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    pub auth: AuthConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub download: DownloadOptions,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Certificate file or PEM text.
    pub certificate: String,
    /// Private key file or PEM text.
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Fernet key file for a sealed passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_file: Option<PathBuf>,
    /// Fernet token file holding the sealed passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_secret_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_validation_attempts")]
    pub attempts: u32,
    #[serde(default = "default_validation_delay_ms")]
    pub delay_ms: u64,
}

/// One unit of batch work: optional upload, actions in order, optional
/// export download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadStep>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStep {
    pub file_id: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStep {
    pub action_id: String,
    pub output: PathBuf,
}

fn default_chunk_size_mb() -> u32 {
    MAX_CHUNK_MB
}

fn default_retry_count() -> u32 {
    3
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.into()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_validation_attempts() -> u32 {
    RetryPolicy::token_warmup().attempts
}

fn default_validation_delay_ms() -> u64 {
    1000
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            api_base: default_api_base(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            attempts: default_validation_attempts(),
            delay_ms: default_validation_delay_ms(),
        }
    }
}

impl Config {
    /// Reads and validates the file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid configuration {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), jobs = config.jobs.len(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_resource_id(&self.workspace_id) {
            bail!("workspace_id must be 32 hex characters");
        }
        if !is_resource_id(&self.model_id) {
            bail!("model_id must be 32 hex characters");
        }
        validate_chunk_size_mb(self.chunk_size_mb)?;
        validate_download_options(&self.download)?;
        if self.auth.certificate.trim().is_empty() || self.auth.private_key.trim().is_empty() {
            bail!("auth.certificate and auth.private_key are required");
        }
        self.auth.passphrase_source()?;

        for job in &self.jobs {
            if let Some(upload) = &job.upload {
                validate_target_id(&upload.file_id)
                    .with_context(|| format!("job {}", job.name))?;
            }
            if job.upload.is_none() && job.actions.is_empty() && job.download.is_none() {
                bail!("job {} has nothing to do", job.name);
            }
        }
        Ok(())
    }

    pub fn auth_settings(&self) -> anyhow::Result<AuthSettings> {
        Ok(AuthSettings::new(&self.auth.certificate, &self.auth.private_key)
            .with_passphrase(self.auth.passphrase_source()?))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            auth_url: self.endpoints.auth_url.clone(),
            api_base: self.endpoints.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn validation_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.validation.attempts,
            Duration::from_millis(self.validation.delay_ms),
        )
    }
}

impl AuthConfig {
    /// The passphrase form in use. A plain passphrase and a sealed pair are
    /// mutually exclusive; a sealed pair needs both files.
    pub fn passphrase_source(&self) -> anyhow::Result<PassphraseSource> {
        let sealed = (&self.secret_key_file, &self.encrypted_secret_file);
        match (&self.passphrase, sealed) {
            (Some(_), (Some(_), _) | (_, Some(_))) => {
                bail!("auth.passphrase cannot be combined with sealed passphrase files")
            }
            (Some(p), _) => Ok(PassphraseSource::plain(p.as_str())),
            (None, (Some(key_file), Some(secret_file))) => Ok(PassphraseSource::SealedFiles {
                key_file: key_file.clone(),
                secret_file: secret_file.clone(),
            }),
            (None, (Some(_), None)) => bail!("auth.encrypted_secret_file is missing"),
            (None, (None, Some(_))) => bail!("auth.secret_key_file is missing"),
            (None, (None, None)) => Ok(PassphraseSource::None),
        }
    }
}

/// Configuration file path: explicit flag, then `PLANLINK_CONFIG`, then the
/// per-user default.
pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(default_path)
}

fn default_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("planlink").join("planlink.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("planlink")
            .join("planlink.toml")
    }
}
