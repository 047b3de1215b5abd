use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Represents the full CLI configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    /// A missing file yields an empty configuration.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using environment only");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Returns either the requested profile or falls back to the default one.
    /// An explicitly requested profile that does not exist is an error.
    pub fn resolve_profile<'a>(&'a self, requested: Option<&'a str>) -> Result<Option<&'a Profile>> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .map(Some)
                .ok_or_else(|| anyhow!("Profile '{name}' not found in config"));
        }

        if let Some(default_name) = self.default_profile.as_deref() {
            return Ok(self.profiles.get(default_name));
        }

        Ok(self.profiles.values().next().filter(|_| self.profiles.len() == 1))
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".jira-update");
        path.push("config.yaml");
        path
    }
}

/// A named Jira site. Every value is optional so the environment can supply
/// whatever the file leaves out.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub display_fields: Vec<DisplayField>,
}

/// An extra line in the find output: `label: <value of field>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayField {
    pub label: String,
    pub field: String,
}

impl DisplayField {
    pub fn new(label: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            field: field.into(),
        }
    }
}

pub fn default_display_fields() -> Vec<DisplayField> {
    vec![
        DisplayField::new("Row #", "customfield_12775"),
        DisplayField::new("CFACTS", "customfield_12850"),
    ]
}

/// Values taken from the environment (`JIRA_URI`, `JIRA_USER`, `JIRA_PASS`).
/// They win over the profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            host: env_value("JIRA_URI"),
            username: env_value("JIRA_USER"),
            password: env_value("JIRA_PASS"),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Everything needed to talk to one Jira site. `password` stays `None` when
/// neither the environment nor the profile has one, so the caller can prompt.
#[derive(Clone)]
pub struct Connection {
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    pub timeout: Option<Duration>,
    pub display_fields: Vec<DisplayField>,
}

impl Connection {
    pub fn resolve(overrides: Overrides, profile: Option<&Profile>) -> Result<Self> {
        let host = overrides
            .host
            .or_else(|| non_blank(profile.and_then(|p| p.host.as_ref())))
            .ok_or_else(|| anyhow!("No Jira host configured. Set JIRA_URI or add `host` to a profile."))?;
        let username = overrides
            .username
            .or_else(|| non_blank(profile.and_then(|p| p.username.as_ref())))
            .ok_or_else(|| anyhow!("No Jira user configured. Set JIRA_USER or add `username` to a profile."))?;
        let password = overrides
            .password
            .or_else(|| non_blank(profile.and_then(|p| p.password.as_ref())));

        let timeout = profile
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs);
        let display_fields = profile
            .map(|p| p.display_fields.clone())
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(default_display_fields);

        Ok(Self {
            host,
            username,
            password,
            timeout,
            display_fields,
        })
    }
}
