//! Configuration management for kennel
//!
//! Tenant-level settings: where the booking backend lives, which tenant the
//! client speaks for, and the tenant's timezone used for every calendar-date
//! comparison.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{KennelError, Result};

/// Tenant-level kennel configuration
///
/// Loaded from `.kennel/config.toml` in the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KennelConfig {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Tenant identity and locale
    #[serde(default)]
    pub tenant: TenantConfig,

    /// Kennel grid defaults
    #[serde(default)]
    pub grid: GridConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the booking backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on 5xx responses
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Tenant identity and locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Sent as `X-Tenant-ID` on every request
    #[serde(default = "default_tenant_id")]
    pub id: String,

    /// IANA timezone of the facility, e.g. `America/Denver`
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Kennel grid defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Page size when listing resources
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Days shown when no window is given
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

// Default value providers
fn default_base_url() -> String {
    "http://localhost:4004".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_token_env() -> String {
    "KENNEL_API_TOKEN".to_string()
}

fn default_tenant_id() -> String {
    "dev".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_window_days() -> u32 {
    7
}

impl KennelConfig {
    /// Load configuration from `.kennel/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".kennel/config.toml");

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| KennelError::Config(format!("Failed to parse config file: {}", e)))?;
        // Fail at load time rather than at the first date comparison
        config.tenant.tz()?;
        Ok(config)
    }

    /// Write default configuration to `.kennel/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".kennel");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| KennelError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl TenantConfig {
    /// Parsed tenant timezone
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }
}

/// Parse an IANA timezone name such as `America/Denver`
pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|e| KennelError::Config(format!("Invalid timezone {:?}: {}", raw, e)))
}

impl Default for KennelConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            tenant: TenantConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            token_env: default_token_env(),
        }
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            id: default_tenant_id(),
            timezone: default_timezone(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            window_days: default_window_days(),
        }
    }
}
