use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::project::ProjectLayout;
use crate::supervisor::{ExitOutcome, Supervisor};
use crate::template::CommandTemplate;

/// Downloader seam: turns a URL into a local file at `dest`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloader backed by an external command template (yt-dlp style), run
/// under the supervisor so a stop request tears the download down too.
pub struct CommandDownloader {
    template: CommandTemplate,
    proxy: Option<String>,
    supervisor: Supervisor,
}

impl CommandDownloader {
    pub fn new(template: CommandTemplate, proxy: Option<String>, supervisor: Supervisor) -> Self {
        Self {
            template,
            proxy,
            supervisor,
        }
    }
}

#[async_trait]
impl MediaDownloader for CommandDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_text = dest.to_string_lossy().to_string();
        let proxy_args: Vec<&str> = match self.proxy.as_deref() {
            Some(address) => vec!["--proxy", address],
            None => Vec::new(),
        };
        let command = self.template.render(
            &[("url", url), ("output", &dest_text)],
            &[("proxy_args", &proxy_args)],
        )?;

        let handle = self
            .supervisor
            .start(&command)
            .await
            .map_err(|e| PipelineError::Resolution(format!("Failed to start downloader: {}", e)))?;
        match self.supervisor.wait(handle).await? {
            ExitOutcome::Exited(status) if status.success() => Ok(()),
            ExitOutcome::Exited(status) => Err(PipelineError::Resolution(format!(
                "Downloader exited with {} for {}",
                status, url
            ))),
            ExitOutcome::Terminated => Err(PipelineError::Cancelled),
        }
    }
}

/// Turns an input specification (local path, platform video ID, or URL)
/// into a local media file inside the cache directory.
pub struct InputResolver {
    layout: ProjectLayout,
    downloader: Box<dyn MediaDownloader>,
    client: reqwest::Client,
    platform_api: String,
}

impl InputResolver {
    pub fn new(
        layout: ProjectLayout,
        downloader: Box<dyn MediaDownloader>,
        proxy: Option<&str>,
        platform_api: String,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(address) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(address)?);
        }
        Ok(Self {
            layout,
            downloader,
            client: builder.build()?,
            platform_api,
        })
    }

    pub async fn resolve(&self, spec: &str) -> Result<PathBuf> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PipelineError::Resolution("Empty input".to_string()));
        }

        // An existing local path resolves to itself.
        let as_path = Path::new(spec);
        if as_path.exists() {
            debug!("Input is an existing local file: {}", spec);
            return Ok(as_path.to_path_buf());
        }

        if is_platform_id(spec) {
            return self.resolve_platform_id(spec).await;
        }
        if looks_like_url(spec) {
            return self.resolve_url(spec).await;
        }

        Err(PipelineError::Resolution(format!(
            "'{}' is neither an existing file, a platform video ID, nor a URL",
            spec
        )))
    }

    async fn resolve_platform_id(&self, id: &str) -> Result<PathBuf> {
        let title = self.lookup_title(id).await?;
        let sanitized = sanitize_title(&title);
        let file_name = if sanitized.is_empty() {
            format!("{}.mp4", id)
        } else {
            format!("{}.mp4", sanitized)
        };
        info!("Downloading video {} ({})", id, title);

        let staged = self.staging_path("mp4").await?;
        let watch_url = format!("https://www.bilibili.com/video/{}", id);
        self.downloader.download(&watch_url, &staged).await?;
        self.move_into_cache(&staged, &file_name).await
    }

    async fn resolve_url(&self, url: &str) -> Result<PathBuf> {
        info!("Downloading video from {}", url);
        let staged = self.staging_path("webm").await?;
        self.downloader.download(url, &staged).await?;
        let file_name = derive_url_file_name(url);
        self.move_into_cache(&staged, &file_name).await
    }

    /// Metadata lookup for a platform video ID. Multi-part videos take the
    /// first part's title.
    async fn lookup_title(&self, id: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.platform_api)
            .query(&[("bvid", id)])
            .send()
            .await
            .map_err(|e| PipelineError::Resolution(format!("Metadata lookup failed: {}", e)))?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Resolution(format!("Malformed metadata response: {}", e)))?;

        if body["code"].as_i64().unwrap_or(-1) != 0 {
            return Err(PipelineError::Resolution(format!(
                "Unknown video ID {}: {}",
                id,
                body["message"].as_str().unwrap_or("lookup rejected")
            )));
        }

        let data = &body["data"];
        let title = if data["videos"].as_u64().unwrap_or(1) <= 1 {
            data["title"].as_str()
        } else {
            data["pages"][0]["part"].as_str()
        };
        title
            .map(|t| t.to_string())
            .ok_or_else(|| PipelineError::Resolution(format!("No title in metadata for {}", id)))
    }

    async fn staging_path(&self, extension: &str) -> Result<PathBuf> {
        let staging = self.layout.staging_dir();
        fs::create_dir_all(&staging).await?;
        Ok(staging.join(format!("{}.{}", Uuid::new_v4(), extension)))
    }

    /// Move a staged download into the cache, guaranteeing at most one file
    /// per basename: a leftover with the same name is removed first.
    async fn move_into_cache(&self, staged: &Path, file_name: &str) -> Result<PathBuf> {
        let cache = self.layout.cache_dir();
        fs::create_dir_all(&cache).await?;

        let dest = cache.join(file_name);
        if dest.exists() {
            debug!("Replacing cached file {}", dest.display());
            fs::remove_file(&dest).await?;
        }
        fs::rename(staged, &dest).await.map_err(|e| {
            PipelineError::Resolution(format!(
                "Failed to move download into cache {}: {}",
                dest.display(),
                e
            ))
        })?;
        Ok(dest)
    }
}

/// Platform video IDs are a `BV` prefix followed by ten alphanumerics.
pub fn is_platform_id(spec: &str) -> bool {
    spec.len() == 12
        && spec.starts_with("BV")
        && spec[2..].chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn looks_like_url(spec: &str) -> bool {
    spec.starts_with("http://")
        || spec.starts_with("https://")
        || spec.contains("youtu.be/")
        || spec.contains("youtube.com/")
}

/// Strip characters that are illegal or awkward in filenames and collapse
/// whitespace runs.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '.' | ':' | '?' | '/' | '\\' => ' ',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive a cache filename for a generic URL: the video-id query parameter
/// or last path segment when usable, otherwise a fresh download id.
fn derive_url_file_name(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (path_part, query) = match without_fragment.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (without_fragment, None),
    };

    if let Some(query) = query {
        for pair in query.split('&') {
            if let Some(video_id) = pair.strip_prefix("v=") {
                let sanitized = sanitize_title(video_id);
                if !sanitized.is_empty() {
                    return format!("{}.webm", sanitized);
                }
            }
        }
    }

    let segment = path_part
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    let sanitized = sanitize_title(segment);
    if sanitized.is_empty() || sanitized.eq_ignore_ascii_case("watch") {
        format!("download-{}.webm", Uuid::new_v4())
    } else {
        format!("{}.webm", sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_platform_id() {
        assert!(is_platform_id("BV1Lxt5e8EJF"));
        assert!(!is_platform_id("BV1Lxt5e8EJ"));
        assert!(!is_platform_id("BV1Lxt5e8EJF0"));
        assert!(!is_platform_id("AV1Lxt5e8EJF"));
        assert!(!is_platform_id("BV1Lxt5e8EJ!"));
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("https://www.youtube.com/watch?v=abc"));
        assert!(looks_like_url("http://example.com/video.mp4"));
        assert!(looks_like_url("youtu.be/abc123"));
        assert!(!looks_like_url("clip.mp4"));
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("A: Title? v1.5"), "A Title v1 5");
        assert_eq!(sanitize_title("path/to\\thing"), "path to thing");
        assert_eq!(sanitize_title("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_title("..."), "");
    }

    #[test]
    fn test_derive_url_file_name() {
        assert_eq!(
            derive_url_file_name("https://www.youtube.com/watch?v=abc123"),
            "abc123.webm"
        );
        assert_eq!(
            derive_url_file_name("https://example.com/media/clip.mp4"),
            "clip mp4.webm"
        );
        assert!(derive_url_file_name("https://example.com/").starts_with("download-"));
    }

    #[tokio::test]
    async fn test_existing_local_path_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, "media bytes").unwrap();

        let layout = ProjectLayout::new(dir.path().join("project"));
        let resolver = InputResolver::new(
            layout,
            Box::new(MockMediaDownloader::new()),
            None,
            "http://127.0.0.1:1/view".to_string(),
        )
        .unwrap();

        let resolved = resolver.resolve(media.to_str().unwrap()).await.unwrap();
        assert_eq!(resolved, media);
    }

    #[tokio::test]
    async fn test_url_download_lands_in_cache_and_replaces_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        layout.ensure().await.unwrap();

        // Pre-existing cached file with the same basename must be replaced.
        std::fs::write(layout.cache_dir().join("abc123.webm"), "stale").unwrap();

        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_download()
            .times(1)
            .returning(|_url, dest| {
                std::fs::write(dest, "fresh bytes").unwrap();
                Ok(())
            });

        let resolver = InputResolver::new(
            layout.clone(),
            Box::new(downloader),
            None,
            "http://127.0.0.1:1/view".to_string(),
        )
        .unwrap();

        let resolved = resolver
            .resolve("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap();
        assert_eq!(resolved, layout.cache_dir().join("abc123.webm"));
        assert_eq!(std::fs::read_to_string(&resolved).unwrap(), "fresh bytes");
    }

    #[tokio::test]
    async fn test_failed_download_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());

        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().times(1).returning(|url, _| {
            Err(PipelineError::Resolution(format!(
                "network unreachable for {}",
                url
            )))
        });

        let resolver = InputResolver::new(
            layout,
            Box::new(downloader),
            None,
            "http://127.0.0.1:1/view".to_string(),
        )
        .unwrap();

        let result = resolver.resolve("https://example.com/video.mp4").await;
        assert!(matches!(result, Err(PipelineError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_unrecognized_input_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let resolver = InputResolver::new(
            layout,
            Box::new(MockMediaDownloader::new()),
            None,
            "http://127.0.0.1:1/view".to_string(),
        )
        .unwrap();

        let result = resolver.resolve("no-such-file.mp4").await;
        assert!(matches!(result, Err(PipelineError::Resolution(_))));
    }
}
