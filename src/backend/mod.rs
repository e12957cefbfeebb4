// Translation backend catalogue.
//
// Each logical backend carries its routing policy as data: which document
// block it configures, the default endpoint, the model-name rewrite, and
// which engine driver ultimately serves it. Selection is by enumerated
// identifier, not by matching display strings.

pub mod document;
pub mod health;

use crate::error::{PipelineError, Result};

/// Where a backend runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// A model server started on this machine and supervised by the pipeline.
    LocalServer,
    /// A hosted API provider reached over HTTP.
    HostedApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Sakura009,
    Sakura010,
    Index,
    Galtransl,
    Gpt35_0613,
    Gpt35_1106,
    Gpt4Turbo,
    MoonshotV1_8k,
    Glm4,
    Glm4Flash,
    Qwen2_7bInstruct,
    Qwen2_57bA14bInstruct,
    Qwen2_72bInstruct,
    Abab65Chat,
    Abab65sChat,
}

impl Backend {
    pub const ALL: &'static [Backend] = &[
        Backend::Sakura009,
        Backend::Sakura010,
        Backend::Index,
        Backend::Galtransl,
        Backend::Gpt35_0613,
        Backend::Gpt35_1106,
        Backend::Gpt4Turbo,
        Backend::MoonshotV1_8k,
        Backend::Glm4,
        Backend::Glm4Flash,
        Backend::Qwen2_7bInstruct,
        Backend::Qwen2_57bA14bInstruct,
        Backend::Qwen2_72bInstruct,
        Backend::Abab65Chat,
        Backend::Abab65sChat,
    ];

    /// Configuration name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sakura009 => "sakura-009",
            Backend::Sakura010 => "sakura-010",
            Backend::Index => "index",
            Backend::Galtransl => "galtransl",
            Backend::Gpt35_0613 => "gpt35-0613",
            Backend::Gpt35_1106 => "gpt35-1106",
            Backend::Gpt4Turbo => "gpt4-turbo",
            Backend::MoonshotV1_8k => "moonshot-v1-8k",
            Backend::Glm4 => "glm-4",
            Backend::Glm4Flash => "glm-4-flash",
            Backend::Qwen2_7bInstruct => "qwen2-7b-instruct",
            Backend::Qwen2_57bA14bInstruct => "qwen2-57b-a14b-instruct",
            Backend::Qwen2_72bInstruct => "qwen2-72b-instruct",
            Backend::Abab65Chat => "abab6.5-chat",
            Backend::Abab65sChat => "abab6.5s-chat",
        }
    }

    /// Parse a configuration value; "none" or empty means translation is
    /// disabled.
    pub fn from_config_name(name: &str) -> Result<Option<Backend>> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Backend::ALL
            .iter()
            .find(|b| b.name() == trimmed)
            .copied()
            .map(Some)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "Unknown translation backend '{}'; valid backends: none, {}",
                    trimmed,
                    Backend::ALL
                        .iter()
                        .map(|b| b.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sakura009 | Backend::Sakura010 | Backend::Index | Backend::Galtransl => {
                BackendKind::LocalServer
            }
            _ => BackendKind::HostedApi,
        }
    }

    /// Driver identifier handed to the translation engine. Local model
    /// families share the two sakura drivers; OpenAI-compatible hosted
    /// providers run through the GPT35 driver with a rewritten endpoint.
    pub fn engine_driver(&self) -> &'static str {
        match self {
            Backend::Sakura009 | Backend::Index => "sakura-009",
            Backend::Sakura010 | Backend::Galtransl => "sakura-010",
            Backend::Gpt35_1106 => "gpt35-1106",
            Backend::Gpt4Turbo => "gpt4-turbo",
            _ => "gpt35-0613",
        }
    }

    /// Document block this backend configures.
    pub fn document_anchor(&self) -> &'static str {
        match self.kind() {
            BackendKind::LocalServer => "SakuraLLM",
            BackendKind::HostedApi => match self {
                Backend::Gpt4Turbo => "GPT4",
                _ => "GPT35",
            },
        }
    }

    /// Default API endpoint for hosted backends.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Backend::Gpt35_0613 | Backend::Gpt35_1106 | Backend::Gpt4Turbo => {
                Some("https://api.openai.com")
            }
            Backend::MoonshotV1_8k => Some("https://api.moonshot.cn"),
            Backend::Glm4 | Backend::Glm4Flash => Some("https://open.bigmodel.cn/api/paas"),
            Backend::Qwen2_7bInstruct | Backend::Qwen2_57bA14bInstruct | Backend::Qwen2_72bInstruct => {
                Some("https://dashscope.aliyuncs.com/compatible-mode")
            }
            Backend::Abab65Chat | Backend::Abab65sChat => Some("https://api.minimax.chat"),
            _ => None,
        }
    }

    /// Model name written into the document so the driver addresses the
    /// provider's actual model. Empty clears a previous override.
    pub fn rewrite_model_name(&self) -> Option<&'static str> {
        match self {
            Backend::Gpt35_0613 | Backend::Gpt35_1106 | Backend::Gpt4Turbo => Some(""),
            Backend::MoonshotV1_8k => Some("moonshot-v1-8k"),
            Backend::Glm4 => Some("glm-4"),
            Backend::Glm4Flash => Some("glm-4-flash"),
            Backend::Qwen2_7bInstruct => Some("qwen2-7b-instruct"),
            Backend::Qwen2_57bA14bInstruct => Some("qwen2-57b-a14b-instruct"),
            Backend::Qwen2_72bInstruct => Some("qwen2-72b-instruct"),
            Backend::Abab65Chat => Some("abab6.5-chat"),
            Backend::Abab65sChat => Some("abab6.5s-chat"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(
                Backend::from_config_name(backend.name()).unwrap(),
                Some(*backend)
            );
        }
    }

    #[test]
    fn test_none_disables_translation() {
        assert_eq!(Backend::from_config_name("none").unwrap(), None);
        assert_eq!(Backend::from_config_name("").unwrap(), None);
        assert_eq!(Backend::from_config_name("None").unwrap(), None);
    }

    #[test]
    fn test_unknown_backend_is_a_config_error() {
        assert!(matches!(
            Backend::from_config_name("gpt5-ultra"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_local_families_map_to_sakura_drivers() {
        assert_eq!(Backend::Index.engine_driver(), "sakura-009");
        assert_eq!(Backend::Galtransl.engine_driver(), "sakura-010");
        assert_eq!(Backend::Index.kind(), BackendKind::LocalServer);
    }

    #[test]
    fn test_hosted_providers_route_through_gpt35_driver() {
        for backend in [
            Backend::MoonshotV1_8k,
            Backend::Glm4Flash,
            Backend::Qwen2_72bInstruct,
            Backend::Abab65sChat,
        ] {
            assert_eq!(backend.engine_driver(), "gpt35-0613");
            assert_eq!(backend.document_anchor(), "GPT35");
            assert!(backend.default_endpoint().is_some());
            assert_eq!(backend.rewrite_model_name(), Some(backend.name()));
        }
        assert_eq!(Backend::Gpt4Turbo.document_anchor(), "GPT4");
        assert_eq!(Backend::Gpt4Turbo.rewrite_model_name(), Some(""));
    }
}
