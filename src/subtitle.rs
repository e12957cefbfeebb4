use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::Result;
use crate::transcript::Transcript;

/// Artifacts the synthesize stage can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    SourceSrt,
    TranslatedSrt,
    BilingualSrt,
    SourceLrc,
    TranslatedLrc,
}

impl OutputFormat {
    /// Formats that can be synthesized without a translated transcript.
    pub fn needs_translation(&self) -> bool {
        matches!(
            self,
            OutputFormat::TranslatedSrt | OutputFormat::BilingualSrt | OutputFormat::TranslatedLrc
        )
    }
}

/// Generate an SRT subtitle file from a transcript.
pub async fn generate_srt<P: AsRef<Path>>(transcript: &Transcript, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    let mut srt_content = String::new();

    for (index, segment) in transcript.segments.iter().enumerate() {
        let start_time = format_srt_time(segment.start);
        let end_time = format_srt_time(segment.end);

        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            start_time,
            end_time,
            segment.text.trim()
        ));
    }

    fs::write(output_path, srt_content).await?;
    Ok(())
}

/// Generate an LRC lyric file from a transcript. Multi-line segment text is
/// flattened because the lyric format is strictly one line per timestamp.
pub async fn generate_lrc<P: AsRef<Path>>(transcript: &Transcript, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating LRC file: {}", output_path.display());

    let mut lrc_content = String::new();

    for segment in &transcript.segments {
        let text = segment.text.split_whitespace().collect::<Vec<_>>().join(" ");
        lrc_content.push_str(&format!("[{}]{}\n", format_lrc_time(segment.start), text));
    }

    fs::write(output_path, lrc_content).await?;
    Ok(())
}

/// Generate a bilingual SRT where each cue carries the source text above the
/// translated text. Cues are paired by index; a missing translation falls
/// back to the source text alone.
pub async fn generate_bilingual_srt<P: AsRef<Path>>(
    source: &Transcript,
    translated: &Transcript,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating bilingual SRT file: {}", output_path.display());

    let mut srt_content = String::new();

    for (index, segment) in source.segments.iter().enumerate() {
        let start_time = format_srt_time(segment.start);
        let end_time = format_srt_time(segment.end);

        let source_text = segment.text.trim();
        let text = match translated.segments.get(index) {
            Some(pair) if !pair.text.trim().is_empty() => {
                format!("{}\n{}", source_text, pair.text.trim())
            }
            _ => source_text.to_string(),
        };

        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            start_time,
            end_time,
            text
        ));
    }

    fs::write(output_path, srt_content).await?;
    Ok(())
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format time in seconds to LRC time format (mm:ss.cc)
fn format_lrc_time(seconds: f64) -> String {
    let total_centiseconds = (seconds * 100.0) as u64;
    let minutes = total_centiseconds / 6_000;
    let secs = (total_centiseconds % 6_000) / 100;
    let centis = total_centiseconds % 100;

    format!("{:02}:{:02}.{:02}", minutes, secs, centis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    fn sample(language: &str, texts: &[&str]) -> Transcript {
        let mut transcript = Transcript::new(language);
        for (i, text) in texts.iter().enumerate() {
            transcript.segments.push(TranscriptSegment {
                id: i as u32,
                start: i as f64 * 2.0,
                end: i as f64 * 2.0 + 1.5,
                text: text.to_string(),
            });
        }
        transcript
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_format_lrc_time() {
        assert_eq!(format_lrc_time(0.0), "00:00.00");
        assert_eq!(format_lrc_time(65.12), "01:05.12");
        assert_eq!(format_lrc_time(600.5), "10:00.50");
    }

    #[tokio::test]
    async fn test_generate_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");
        generate_srt(&sample("ja", &["こんにちは", "さようなら"]), &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1\n00:00:00,000 --> 00:00:01,500\nこんにちは\n"));
        assert!(written.contains("2\n00:00:02,000 --> 00:00:03,500\nさようなら\n"));
    }

    #[tokio::test]
    async fn test_generate_lrc_flattens_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.lrc");
        generate_lrc(&sample("zh-cn", &["第一行\n第二行"]), &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[00:00.00]第一行 第二行\n");
    }

    #[tokio::test]
    async fn test_generate_bilingual_pairs_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");
        let source = sample("ja", &["こんにちは", "さようなら"]);
        let translated = sample("zh-cn", &["你好"]);
        generate_bilingual_srt(&source, &translated, &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("こんにちは\n你好\n"));
        // Second cue has no translated counterpart.
        assert!(written.contains("さようなら\n\n"));
    }
}
