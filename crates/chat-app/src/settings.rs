use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use snafu::{ResultExt, Snafu};

use norma_assistant::{DEFAULT_ENDPOINT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, EndpointConfig};

/// Environment variable that overrides the configured endpoint base URL.
pub const ENDPOINT_URL_ENV_VAR: &str = "NORMA_ENDPOINT_URL";

const SETTINGS_RELATIVE_PATH: &str = ".norma/settings.conf";

const KEY_ENDPOINT_BASE_URL: &str = "endpoint_base_url";
const KEY_REQUEST_TIMEOUT_SECONDS: &str = "request_timeout_seconds";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create the settings directory '{}'", path.display()))]
    CreateConfigDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to write the settings file '{}'", path.display()))]
    WriteSettings {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Settings that persist across app restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Base URL of the answering service.
    pub endpoint_base_url: String,
    /// Per-request timeout for the answering service.
    pub request_timeout_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint_base_url: DEFAULT_ENDPOINT_BASE_URL.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl AppSettings {
    /// Builds the endpoint config these settings describe.
    pub fn to_endpoint_config(&self) -> EndpointConfig {
        EndpointConfig::new(&self.endpoint_base_url)
            .with_timeout(Duration::from_secs(self.request_timeout_seconds))
    }

    /// Applies an externally supplied base URL, typically from
    /// [`ENDPOINT_URL_ENV_VAR`]. Blank overrides are ignored.
    pub fn with_endpoint_override(mut self, base_url: Option<&str>) -> Self {
        if let Some(base_url) = base_url
            && !base_url.trim().is_empty()
        {
            self.endpoint_base_url = base_url.trim().to_string();
        }
        self
    }

    fn apply_line(&mut self, key: &str, value: &str) {
        match key {
            KEY_ENDPOINT_BASE_URL => self.endpoint_base_url = value.to_string(),
            KEY_REQUEST_TIMEOUT_SECONDS => match value.parse::<u64>() {
                Ok(seconds) => self.request_timeout_seconds = seconds,
                Err(_) => tracing::warn!(raw = value, "ignoring unparsable request timeout"),
            },
            // Unknown keys are tolerated so old files keep loading.
            _ => {}
        }
    }
}

/// Persists [`AppSettings`] as a line-based `key=value` file.
pub struct SettingsStore {
    settings: AppSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    /// Default settings path, relative to the working directory.
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(SETTINGS_RELATIVE_PATH)
    }

    pub fn new(config_path: PathBuf) -> Self {
        Self {
            settings: Self::read_or_default(&config_path),
            config_path,
        }
    }

    /// Loads settings from the default path.
    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Replaces the settings and writes them to disk.
    pub fn update(&mut self, settings: AppSettings) -> Result<(), SettingsError> {
        self.persist(&settings)?;
        self.settings = settings;
        Ok(())
    }

    fn read_or_default(path: &Path) -> AppSettings {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_settings(&content),
            Err(error) => {
                tracing::info!(
                    path = %path.display(),
                    %error,
                    "no readable settings file, using defaults"
                );
                AppSettings::default()
            }
        }
    }

    /// Parses `key=value` lines. `#` starts a comment; unknown keys and
    /// unparsable values fall back to the defaults.
    fn parse_settings(content: &str) -> AppSettings {
        let mut settings = AppSettings::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            settings.apply_line(key.trim(), value.trim());
        }
        settings
    }

    fn format_settings(settings: &AppSettings) -> String {
        let mut content = String::from("# norma settings\n");
        content.push_str(&format!(
            "{KEY_ENDPOINT_BASE_URL}={}\n",
            settings.endpoint_base_url
        ));
        content.push_str(&format!(
            "{KEY_REQUEST_TIMEOUT_SECONDS}={}\n",
            settings.request_timeout_seconds
        ));
        content
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(CreateConfigDirSnafu {
                stage: "create-settings-dir",
                path: parent.to_path_buf(),
            })?;
        }

        fs::write(&self.config_path, Self::format_settings(settings)).context(
            WriteSettingsSnafu {
                stage: "write-settings-file",
                path: self.config_path.clone(),
            },
        )?;
        tracing::info!(path = %self.config_path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings = SettingsStore::parse_settings("# nothing configured\n");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn configured_keys_are_parsed() {
        let settings = SettingsStore::parse_settings(
            "endpoint_base_url=http://assistant.internal:9000\nrequest_timeout_seconds=15\n",
        );
        assert_eq!(settings.endpoint_base_url, "http://assistant.internal:9000");
        assert_eq!(settings.request_timeout_seconds, 15);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_ignored() {
        let settings = SettingsStore::parse_settings(
            "theme=dark\nrequest_timeout_seconds=soon\nendpoint_base_url = http://localhost:8000 \n",
        );
        assert_eq!(settings.endpoint_base_url, "http://localhost:8000");
        assert_eq!(
            settings.request_timeout_seconds,
            AppSettings::default().request_timeout_seconds
        );
    }

    #[test]
    fn format_and_parse_round_trip() {
        let settings = AppSettings {
            endpoint_base_url: "http://10.0.0.4:8000".to_string(),
            request_timeout_seconds: 30,
        };
        let parsed = SettingsStore::parse_settings(&SettingsStore::format_settings(&settings));
        assert_eq!(parsed, settings);
    }

    #[test]
    fn update_persists_and_reloads() {
        let path =
            std::env::temp_dir().join(format!("norma-settings-{}.conf", std::process::id()));
        let mut store = SettingsStore::new(path.clone());
        store
            .update(AppSettings {
                endpoint_base_url: "http://10.1.1.1:8000".to_string(),
                request_timeout_seconds: 5,
            })
            .expect("settings persist");

        let reloaded = SettingsStore::new(path.clone());
        assert_eq!(reloaded.settings(), store.settings());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn endpoint_override_replaces_the_configured_url() {
        let settings =
            AppSettings::default().with_endpoint_override(Some(" http://override:8000 "));
        assert_eq!(settings.endpoint_base_url, "http://override:8000");
    }

    #[test]
    fn blank_endpoint_override_is_ignored() {
        let settings = AppSettings::default().with_endpoint_override(Some("   "));
        assert_eq!(settings.endpoint_base_url, DEFAULT_ENDPOINT_BASE_URL);
    }
}
