use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A fully rendered external command: program plus argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// User-editable engine command template. Placeholders are `{name}` tokens
/// substituted verbatim; substitution happens per whitespace-separated
/// token, so a value containing spaces stays a single argument.
///
/// A token that consists of a single splat placeholder (e.g. `{proxy_args}`)
/// expands to zero or more arguments instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self { raw: raw.into() }
    }

    pub fn render(&self, values: &[(&str, &str)], splats: &[(&str, &[&str])]) -> Result<CommandLine> {
        let mut tokens: Vec<String> = Vec::new();

        'token: for token in self.raw.split_whitespace() {
            for (name, args) in splats {
                if token == format!("{{{}}}", name) {
                    tokens.extend(args.iter().map(|a| a.to_string()));
                    continue 'token;
                }
            }

            let mut rendered = token.to_string();
            for (name, value) in values {
                rendered = rendered.replace(&format!("{{{}}}", name), value);
            }
            if let Some(unresolved) = find_placeholder(&rendered) {
                return Err(PipelineError::Config(format!(
                    "Unresolved placeholder {{{}}} in command template '{}'",
                    unresolved, self.raw
                )));
            }
            if !rendered.is_empty() {
                tokens.push(rendered);
            }
        }

        if tokens.is_empty() {
            return Err(PipelineError::Config(format!(
                "Command template '{}' rendered to an empty command",
                self.raw
            )));
        }

        let program = tokens.remove(0);
        Ok(CommandLine {
            program,
            args: tokens,
        })
    }
}

/// Returns the first `{name}` placeholder left in the text, if any.
fn find_placeholder(text: &str) -> Option<String> {
    let open = text.find('{')?;
    let rest = &text[open + 1..];
    let close = rest.find('}')?;
    let name = &rest[..close];
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Some(name.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let template =
            CommandTemplate::new("ffmpeg -y -i {input} -vn -acodec pcm_s16le {output}");
        let cmd = template
            .render(&[("input", "in.mp4"), ("output", "out.wav")], &[])
            .unwrap();
        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.mp4", "-vn", "-acodec", "pcm_s16le", "out.wav"]
        );
    }

    #[test]
    fn test_value_with_spaces_stays_one_argument() {
        let template = CommandTemplate::new("whisper-cli -m {model} {input}");
        let cmd = template
            .render(
                &[("model", "ggml.bin"), ("input", "My Recording 01.wav")],
                &[],
            )
            .unwrap();
        assert_eq!(cmd.args, vec!["-m", "ggml.bin", "My Recording 01.wav"]);
    }

    #[test]
    fn test_splat_expands_to_nothing_or_many() {
        let template = CommandTemplate::new("yt-dlp {proxy_args} -o {output} {url}");

        let without = template
            .render(
                &[("output", "x.webm"), ("url", "https://example.com/v")],
                &[("proxy_args", &[][..])],
            )
            .unwrap();
        assert_eq!(
            without.args,
            vec!["-o", "x.webm", "https://example.com/v"]
        );

        let with = template
            .render(
                &[("output", "x.webm"), ("url", "https://example.com/v")],
                &[("proxy_args", &["--proxy", "http://127.0.0.1:7890"][..])],
            )
            .unwrap();
        assert_eq!(
            with.args,
            vec!["--proxy", "http://127.0.0.1:7890", "-o", "x.webm", "https://example.com/v"]
        );
    }

    #[test]
    fn test_unresolved_placeholder_is_an_error() {
        let template = CommandTemplate::new("engine {model}");
        let err = template.render(&[], &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_empty_template_is_an_error() {
        let template = CommandTemplate::new("   ");
        assert!(template.render(&[], &[]).is_err());
    }
}
