use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::subtitle::OutputFormat;

fn default_health_timeout_secs() -> u64 {
    120
}

fn default_platform_api() -> String {
    "https://api.bilibili.com/x/web-interface/view".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    pub proxy: ProxyConfig,
    pub languages: LanguageConfig,
    pub transcriber: TranscriberConfig,
    pub backend: BackendConfig,
    pub media: MediaConfig,
    pub downloader: DownloaderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root of the working tree every stage reads from and writes to
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy address for downloads and metadata lookups; empty disables it
    pub address: String,
}

impl ProxyConfig {
    pub fn address_opt(&self) -> Option<&str> {
        let trimmed = self.address.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Source language code passed to the speech engine
    pub source: String,
    /// Target language code for translation
    pub target: String,
}

impl LanguageConfig {
    /// Language pair in the notation the translation engine expects
    pub fn pair(&self) -> String {
        format!("{}2{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Whether speech recognition runs at all
    pub enabled: bool,
    /// Model file handed to the speech engine via the {model} placeholder
    pub model: String,
    /// Speech engine command template
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Logical backend name; "none" disables translation
    pub name: String,
    /// API token for hosted backends
    pub token: String,
    /// Explicit endpoint overriding the backend's default; empty keeps the
    /// default
    #[serde(default)]
    pub endpoint: String,
    /// Explicit model name overriding the backend's rewrite policy
    #[serde(default)]
    pub model_name: String,
    /// Model file for locally hosted backends
    pub local_model: String,
    /// GPU offload layer count for the local server
    pub gpu_layers: u32,
    /// Port the local server listens on
    pub port: u16,
    /// Local server command template
    pub serve_command: String,
    /// Translation engine command template
    pub translate_command: String,
    /// Path of the engine's configuration document
    pub document: PathBuf,
    /// Upper bound for the local server health poll
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Audio extraction command template
    pub extract_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Downloader command template
    pub command: String,
    /// Metadata endpoint for platform video IDs
    #[serde(default = "default_platform_api")]
    pub platform_api: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Artifacts the synthesize stage produces
    pub formats: Vec<OutputFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                root: PathBuf::from("project"),
            },
            proxy: ProxyConfig {
                address: String::new(),
            },
            languages: LanguageConfig {
                source: "ja".to_string(),
                target: "zh-cn".to_string(),
            },
            transcriber: TranscriberConfig {
                enabled: true,
                model: "models/ggml-medium.bin".to_string(),
                command: "whisper-cli -m {model} -osrt -l {lang} {input} -of {output_base}"
                    .to_string(),
            },
            backend: BackendConfig {
                name: "none".to_string(),
                token: String::new(),
                endpoint: String::new(),
                model_name: String::new(),
                local_model: "models/sakura-13b-q4.gguf".to_string(),
                gpu_layers: 999,
                port: 8080,
                serve_command:
                    "llama-server -m {model} -c 2048 -ngl {gpu_layers} --host 127.0.0.1 --port {port}"
                        .to_string(),
                translate_command:
                    "galtransl --project {project} --config {config} --translator {translator}"
                        .to_string(),
                document: PathBuf::from("project/engine.yaml"),
                health_timeout_secs: default_health_timeout_secs(),
            },
            media: MediaConfig {
                extract_command:
                    "ffmpeg -y -i {input} -vn -acodec pcm_s16le -ac 1 -ar 16000 {output}"
                        .to_string(),
            },
            downloader: DownloaderConfig {
                command: "yt-dlp {proxy_args} -o {output} {url}".to_string(),
                platform_api: default_platform_api(),
            },
            output: OutputConfig {
                formats: vec![
                    OutputFormat::SourceSrt,
                    OutputFormat::TranslatedSrt,
                    OutputFormat::TranslatedLrc,
                ],
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PipelineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
