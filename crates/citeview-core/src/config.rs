use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;

pub const CONFIG_DIRECTORY_NAME: &str = "citeview";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub documents_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    /// Pause after each tool-call transition.
    pub tool_delay_ms: u64,
    pub component_delay_ms: u64,
    pub char_delay_ms: u64,
    pub citation_delay_ms: u64,
    /// Write the sample PDFs the scripted answers cite when they are missing.
    pub seed_samples: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            documents_dir: PathBuf::from("pdfs"),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:3001".to_string(),
            ],
            tool_delay_ms: 400,
            component_delay_ms: 200,
            char_delay_ms: 15,
            citation_delay_ms: 100,
            seed_samples: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` falls back to the platform data directory.
    pub transcript_path: Option<PathBuf>,
    pub history: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            transcript_path: None,
            history: true,
        }
    }
}

impl ClientConfig {
    pub fn transcript_path(&self) -> PathBuf {
        self.transcript_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(CONFIG_DIRECTORY_NAME))
                .unwrap_or_else(|| PathBuf::from(".citeview"))
                .join("transcript.jsonl")
        })
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIRECTORY_NAME).join(CONFIG_FILE_NAME))
    }

    /// Reads `explicit`, else the per-user config file. A file that does not
    /// exist yields defaults; one that fails to parse is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).context(ReadFileSnafu {
            stage: "read-config-file",
            path: path.to_path_buf(),
        })?;
        let config = toml::from_str::<Config>(&raw).context(ParseSnafu {
            stage: "parse-config-toml",
            path: path.to_path_buf(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read config file at {path:?} on `{stage}`: {source}"))]
    ReadFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse config file at {path:?} on `{stage}`: {source}"))]
    Parse {
        stage: &'static str,
        path: PathBuf,
        source: toml::de::Error,
    },
}
