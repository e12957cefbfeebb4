use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Result;

/// Dictionary overrides applied around the translation engine: entries are
/// one per line, term and replacement separated by whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionaries {
    pub before: String,
    pub gpt: String,
    pub after: String,
}

/// Report returned by the clean sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed_files: u64,
    pub reclaimed_bytes: u64,
}

/// Fixed working tree every stage reads from and writes to by convention.
///
/// ```text
/// <root>/
///   cache/        resolved media and final subtitle artifacts
///   staging/      in-flight downloads
///   gt_input/     intermediate transcripts handed to the translation engine
///   gt_output/    translated transcripts written back by the engine
///   transl_cache/ the engine's own cache
///   log/          rolling pipeline log
/// ```
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn engine_input_dir(&self) -> PathBuf {
        self.root.join("gt_input")
    }

    pub fn engine_output_dir(&self) -> PathBuf {
        self.root.join("gt_output")
    }

    pub fn engine_cache_dir(&self) -> PathBuf {
        self.root.join("transl_cache")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    pub fn dict_before_path(&self) -> PathBuf {
        self.root.join("dict_before.txt")
    }

    pub fn dict_gpt_path(&self) -> PathBuf {
        self.root.join("dict_gpt.txt")
    }

    pub fn dict_after_path(&self) -> PathBuf {
        self.root.join("dict_after.txt")
    }

    pub fn extra_prompt_path(&self) -> PathBuf {
        self.root.join("extra_prompt.txt")
    }

    pub async fn ensure(&self) -> Result<()> {
        for dir in [
            self.cache_dir(),
            self.staging_dir(),
            self.engine_input_dir(),
            self.engine_output_dir(),
            self.engine_cache_dir(),
        ] {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Write the per-run engine inputs: dictionary tables (entries
    /// normalized to tab separation) and the extra free-text prompt. An
    /// empty table removes the corresponding file so the engine falls back
    /// to its defaults.
    pub async fn apply_job_files(&self, dictionaries: &Dictionaries, extra_prompt: &str) -> Result<()> {
        write_or_remove(
            &self.dict_before_path(),
            &normalize_dictionary(&dictionaries.before),
        )
        .await?;
        write_or_remove(&self.dict_gpt_path(), &normalize_dictionary(&dictionaries.gpt)).await?;
        write_or_remove(
            &self.dict_after_path(),
            &normalize_dictionary(&dictionaries.after),
        )
        .await?;
        write_or_remove(&self.extra_prompt_path(), extra_prompt.trim()).await?;
        Ok(())
    }

    /// Remove every intermediate and cached file under the project tree.
    /// Partial downloads left behind by failed resolutions go with it.
    pub async fn clean(&self) -> Result<CleanReport> {
        let mut report = CleanReport::default();

        for dir in [
            self.engine_input_dir(),
            self.engine_output_dir(),
            self.engine_cache_dir(),
            self.staging_dir(),
            self.cache_dir(),
        ] {
            if !dir.exists() {
                continue;
            }
            for entry in WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    report.removed_files += 1;
                    report.reclaimed_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
            debug!("Removing {}", dir.display());
            fs::remove_dir_all(&dir).await?;
        }

        info!(
            "Cleaned {} files ({} bytes) under {}",
            report.removed_files,
            report.reclaimed_bytes,
            self.root.display()
        );
        Ok(report)
    }
}

async fn write_or_remove(path: &Path, content: &str) -> Result<()> {
    if content.is_empty() {
        if path.exists() {
            fs::remove_file(path).await?;
        }
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(())
}

/// Dictionary entries may be typed with spaces; the engine expects tabs.
fn normalize_dictionary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        trimmed.replace(' ', "\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dictionary() {
        assert_eq!(normalize_dictionary("犬 狗\n猫 貓"), "犬\t狗\n猫\t貓");
        assert_eq!(normalize_dictionary("   "), "");
    }

    #[tokio::test]
    async fn test_apply_job_files_writes_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        layout.ensure().await.unwrap();

        let dictionaries = Dictionaries {
            before: "犬 狗".to_string(),
            gpt: String::new(),
            after: String::new(),
        };
        layout.apply_job_files(&dictionaries, "polite register").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(layout.dict_before_path()).unwrap(),
            "犬\t狗"
        );
        assert!(!layout.dict_gpt_path().exists());
        assert_eq!(
            std::fs::read_to_string(layout.extra_prompt_path()).unwrap(),
            "polite register"
        );

        // Emptying a previously written table removes its file.
        layout
            .apply_job_files(&Dictionaries::default(), "")
            .await
            .unwrap();
        assert!(!layout.dict_before_path().exists());
        assert!(!layout.extra_prompt_path().exists());
    }

    #[tokio::test]
    async fn test_clean_sweeps_working_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        layout.ensure().await.unwrap();

        std::fs::write(layout.cache_dir().join("a.srt"), "cached").unwrap();
        std::fs::write(layout.staging_dir().join("partial.webm"), "half").unwrap();

        let report = layout.clean().await.unwrap();
        assert_eq!(report.removed_files, 2);
        assert!(report.reclaimed_bytes > 0);
        assert!(!layout.cache_dir().exists());

        // Second sweep has nothing left to do.
        let again = layout.clean().await.unwrap();
        assert_eq!(again.removed_files, 0);
    }
}
