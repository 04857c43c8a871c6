use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use parlor_backend::{BackendConfig, DEFAULT_BACKEND_URL, DEFAULT_REQUEST_TIMEOUT};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "parlor";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "PARLOR_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

impl From<String> for ThemePreference {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

impl From<ThemePreference> for String {
    fn from(value: ThemePreference) -> Self {
        value.name().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Zero disables the timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub theme_mode: ThemePreference,
    #[serde(default)]
    pub theme_name: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            theme_mode: ThemePreference::default(),
            theme_name: String::new(),
        }
    }
}

impl ClientSettings {
    pub fn normalized(mut self) -> Self {
        self.backend_url = if self.backend_url.trim().is_empty() {
            default_backend_url()
        } else {
            self.backend_url.trim().to_string()
        };
        self.theme_name = self.theme_name.trim().to_string();
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(&self.backend_url).with_request_timeout(self.request_timeout())
    }
}

/// Settings shared across the app, persisted as JSON under the user config directory.
pub struct SettingsStore {
    settings: Arc<ArcSwap<ClientSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".parlor"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<ClientSettings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update(&self, settings: ClientSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> ClientSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        // Environment overrides the file, which overrides defaults.
        let figment = Figment::from(Serialized::defaults(ClientSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX));

        match figment.extract::<ClientSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                ClientSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ClientSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let store = SettingsStore::new(jail.directory().join("absent.json"));
            let settings = store.settings();

            assert_eq!(*settings, ClientSettings::default());
            assert_eq!(settings.backend_url, "http://127.0.0.1:5000");
            assert_eq!(settings.request_timeout(), Some(Duration::from_secs(120)));
            Ok(())
        });
    }

    #[test]
    fn file_values_are_normalized_and_env_wins() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{
                    "backend_url": "  http://chat.local:8080/api  ",
                    "theme_mode": "Dark",
                    "theme_name": " Solarized "
                }"#,
            )?;
            jail.set_env("PARLOR_REQUEST_TIMEOUT_SECS", "0");

            let store = SettingsStore::new(jail.directory().join("settings.json"));
            let settings = store.settings();

            assert_eq!(settings.backend_url, "http://chat.local:8080/api");
            assert_eq!(settings.theme_mode, ThemePreference::Dark);
            assert_eq!(settings.theme_name, "Solarized");
            assert_eq!(settings.request_timeout(), None);

            let config = settings.backend_config();
            assert_eq!(config.base_url, "http://chat.local:8080/api");
            assert_eq!(config.request_timeout, None);
            Ok(())
        });
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", r#"{"request_timeout_secs": "soon"}"#)?;

            let store = SettingsStore::new(jail.directory().join("settings.json"));
            assert_eq!(*store.settings(), ClientSettings::default());
            Ok(())
        });
    }

    #[test]
    fn update_persists_and_reloads() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join(SETTINGS_FILE_NAME);
            let store = SettingsStore::new(path.clone());

            store
                .update(ClientSettings {
                    backend_url: "   ".to_string(),
                    request_timeout_secs: 30,
                    theme_mode: ThemePreference::Dark,
                    theme_name: String::new(),
                })
                .unwrap();

            assert_eq!(store.settings().backend_url, DEFAULT_BACKEND_URL);
            assert!(path.exists());
            assert!(!path.with_extension("json.tmp").exists());

            let written = std::fs::read_to_string(&path).unwrap();
            assert!(written.contains("\"theme_mode\": \"dark\""));

            let reloaded = SettingsStore::new(path);
            assert_eq!(reloaded.settings().request_timeout_secs, 30);
            assert!(reloaded.settings().theme_mode.is_dark());
            Ok(())
        });
    }
}
