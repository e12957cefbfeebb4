// Rewriter for the translation engine's configuration document.
//
// The document is line-oriented with named anchor blocks. Instead of
// patching lines at fixed offsets below an anchor, the rewriter indexes the
// block structure and mutates fields by key, so reordering fields inside a
// block cannot corrupt a neighbour. Untouched lines survive byte-for-byte.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Backend, BackendKind};
use crate::error::{PipelineError, Result};

/// Everything the rewriter needs to route a run at one backend.
#[derive(Debug, Clone)]
pub struct BackendSelection {
    pub backend: Backend,
    /// API token; `None` keeps the token already in the document.
    pub token: Option<String>,
    /// Explicit endpoint overriding the backend's default.
    pub endpoint_override: Option<String>,
    /// Explicit model name overriding the backend's rewrite policy.
    pub model_override: Option<String>,
    /// Local server endpoint, for `LocalServer` backends.
    pub local_endpoint: Option<String>,
    pub proxy: Option<String>,
    /// Source→target pair in the engine's notation (e.g. `ja2zh-cn`).
    pub language_pair: String,
}

#[derive(Debug)]
pub struct ConfigDocument {
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
}

impl ConfigDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read engine configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::from_str_at(path, &content))
    }

    fn from_str_at(path: &Path, content: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: content.lines().map(|l| l.to_string()).collect(),
            trailing_newline: content.ends_with('\n'),
        }
    }

    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    /// Atomic save: write a sibling temporary file, flush, rename over the
    /// original. A failure mid-write leaves the previous document intact.
    pub fn save(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            PipelineError::Config(format!("Failed to stage engine configuration: {}", e))
        })?;
        temp.write_all(self.render().as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| {
                PipelineError::Config(format!("Failed to write engine configuration: {}", e))
            })?;
        temp.persist(&self.path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to replace engine configuration {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("Engine configuration saved: {}", self.path.display());
        Ok(())
    }

    /// Route the document at the selected backend: language pair, proxy
    /// block, and exactly the selected backend's fields. Every other line
    /// is left as loaded.
    pub fn apply_selection(&mut self, selection: &BackendSelection) -> Result<()> {
        self.set_field("common", "language", &selection.language_pair)?;

        match selection.proxy.as_deref() {
            Some(address) => {
                self.set_field("proxy", "enableProxy", "true")?;
                self.set_field("proxy", "- address", address)?;
            }
            None => {
                self.set_field("proxy", "enableProxy", "false")?;
                self.set_field("proxy", "- address", "")?;
            }
        }

        let anchor = selection.backend.document_anchor();
        match selection.backend.kind() {
            BackendKind::LocalServer => {
                let endpoint = selection.local_endpoint.as_deref().ok_or_else(|| {
                    PipelineError::Config(
                        "Local backend selected without a server endpoint".to_string(),
                    )
                })?;
                self.set_field(anchor, "endpoint", endpoint)?;
            }
            BackendKind::HostedApi => {
                if let Some(token) = selection.token.as_deref() {
                    self.set_field(anchor, "- token", token)?;
                }
                let endpoint = selection
                    .endpoint_override
                    .as_deref()
                    .or_else(|| selection.backend.default_endpoint())
                    .ok_or_else(|| {
                        PipelineError::Config(format!(
                            "No endpoint known for backend {}",
                            selection.backend.name()
                        ))
                    })?;
                self.set_field(anchor, "defaultEndpoint", endpoint)?;

                let model = selection
                    .model_override
                    .as_deref()
                    .or_else(|| selection.backend.rewrite_model_name())
                    .unwrap_or("");
                self.set_field(anchor, "rewriteModelName", &format!("\"{}\"", model))?;
            }
        }
        Ok(())
    }

    /// Current value of a field inside an anchor block, if present.
    pub fn get_field(&self, anchor: &str, key: &str) -> Option<String> {
        let index = self.find_field(anchor, key).ok()?;
        let trimmed = self.lines[index].trim_start();
        let value = trimmed[key.len() + 1..].trim();
        Some(value.to_string())
    }

    fn set_field(&mut self, anchor: &str, key: &str, value: &str) -> Result<()> {
        let index = self.find_field(anchor, key)?;
        let line = &self.lines[index];
        let indent_len = line.len() - line.trim_start().len();
        let prefix = &line[..indent_len];
        self.lines[index] = if value.is_empty() {
            format!("{}{}:", prefix, key)
        } else {
            format!("{}{}: {}", prefix, key, value)
        };
        Ok(())
    }

    /// Locate `key:` within the block opened by the `anchor:` line. The
    /// block extends over every following line indented deeper than the
    /// anchor; blank lines inside it are skipped.
    fn find_field(&self, anchor: &str, key: &str) -> Result<usize> {
        let anchor_marker = format!("{}:", anchor);
        let anchor_index = self
            .lines
            .iter()
            .position(|line| line.trim() == anchor_marker)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "Engine configuration {} has no '{}' block",
                    self.path.display(),
                    anchor
                ))
            })?;
        let anchor_indent = indent_of(&self.lines[anchor_index]);

        let key_marker = format!("{}:", key);
        for (offset, line) in self.lines[anchor_index + 1..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if indent_of(line) <= anchor_indent {
                break;
            }
            let trimmed = line.trim_start();
            if trimmed == key_marker || trimmed.starts_with(&format!("{} ", key_marker)) {
                return Ok(anchor_index + 1 + offset);
            }
        }
        Err(PipelineError::Config(format!(
            "Engine configuration {} has no '{}' field under '{}'",
            self.path.display(),
            key,
            anchor
        )))
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Template written by `init` when no engine document exists yet.
pub const DEFAULT_DOCUMENT: &str = "\
# Translation engine configuration
common:
  language: ja2zh-cn
proxy:
  enableProxy: false
  proxies:
    - address:
backendSpecific:
  GPT35:
    tokens:
      - token:
    defaultEndpoint: https://api.openai.com
    rewriteModelName: \"\"
  GPT4:
    tokens:
      - token:
    defaultEndpoint: https://api.openai.com
    rewriteModelName: \"\"
  SakuraLLM:
    endpoint: http://127.0.0.1:8080
";

pub fn write_default_document<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, DEFAULT_DOCUMENT).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to write engine configuration {}: {}",
            path.display(),
            e
        ))
    })
}
