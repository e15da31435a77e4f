use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Connection and load settings stored under a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub graph: Option<String>,
    pub max_task_bytes: Option<usize>,
    pub io_timeout_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    profiles: BTreeMap<String, Profile>,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path,
            data,
            profiles,
        })
    }

    pub fn default_profile_name(&self) -> Option<&str> {
        self.data
            .default_profile
            .as_deref()
            .filter(|name| self.profiles.contains_key(*name))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile named `name`, or the default profile when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<&Profile>, ConfigError> {
        match name {
            Some(name) => self
                .profile(name)
                .map(Some)
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                }),
            None => Ok(self.default_profile_name().and_then(|n| self.profile(n))),
        }
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn set_default_profile(&mut self, name: Option<&str>) -> Result<(), ConfigError> {
        if let Some(name) = name {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            self.data.default_profile = Some(name.to_string());
        } else {
            self.data.default_profile = None;
        }
        Ok(())
    }

    pub fn upsert_profile(&mut self, name: &str, update: ProfileUpdate) -> Result<(), ConfigError> {
        let entry = self.data.profiles.entry(name.to_string()).or_default();
        if let Some(host) = update.host {
            entry.host = Some(host);
        }
        if let Some(port) = update.port {
            entry.port = Some(port);
        }
        if let Some(username) = update.username {
            entry.username = Some(username);
        }
        if let Some(password) = update.password {
            entry.password = Some(password);
        }
        if let Some(graph) = update.graph {
            entry.graph = Some(graph);
        }
        if let Some(max_task_bytes) = update.max_task_bytes {
            entry.max_task_bytes = Some(max_task_bytes);
        }
        if let Some(timeout) = update.io_timeout_ms {
            entry.io_timeout_ms = Some(timeout);
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = match self.path.clone().or_else(default_config_path) {
            Some(path) => path,
            None => return Err(ConfigError::NoConfigPath),
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = toml::to_string_pretty(&self.data)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.data.profiles.remove(name).is_none() {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        if self.data.default_profile.as_deref() == Some(name) {
            self.data.default_profile = None;
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_profiles(data: &RawConfig) -> Result<BTreeMap<String, Profile>, ConfigError> {
    let mut profiles = BTreeMap::new();
    for (name, raw) in &data.profiles {
        profiles.insert(name.clone(), convert_profile(name, raw)?);
    }
    if let Some(default_name) = data.default_profile.as_ref() {
        if !profiles.contains_key(default_name) {
            return Err(ConfigError::ProfileNotFound {
                name: default_name.clone(),
            });
        }
    }
    Ok(profiles)
}

fn convert_profile(name: &str, raw: &RawProfile) -> Result<Profile, ConfigError> {
    if raw.max_task_bytes == Some(0) {
        return Err(ConfigError::InvalidValue {
            profile: name.to_string(),
            field: "max_task_bytes",
            value: "0".into(),
        });
    }
    if let Some(host) = raw.host.as_deref().filter(|h| h.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            profile: name.to_string(),
            field: "host",
            value: host.to_string(),
        });
    }
    Ok(Profile {
        name: name.to_string(),
        host: raw.host.clone(),
        port: raw.port,
        username: raw.username.clone(),
        password: raw.password.clone(),
        graph: raw.graph.clone(),
        max_task_bytes: raw.max_task_bytes,
        io_timeout_ms: raw.io_timeout_ms,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    default_profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawProfile {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    graph: Option<String>,
    max_task_bytes: Option<usize>,
    io_timeout_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub graph: Option<String>,
    pub max_task_bytes: Option<usize>,
    pub io_timeout_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize CLI config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write CLI config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },
    #[error("profile '{profile}' {field} value '{value}' is invalid")]
    InvalidValue {
        profile: String,
        field: &'static str,
        value: String,
    },
    #[error("no config directory found; pass --config or set GRAPHLOAD_CONFIG")]
    NoConfigPath,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("graphload").join("cli.toml"))
}
