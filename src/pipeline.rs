use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::document::{BackendSelection, ConfigDocument};
use crate::backend::health;
use crate::backend::{Backend, BackendKind};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::project::{Dictionaries, ProjectLayout};
use crate::resolve::{CommandDownloader, InputResolver, MediaDownloader};
use crate::status::StatusSink;
use crate::subtitle::{self, OutputFormat};
use crate::supervisor::{ExitOutcome, ProcessHandle, Supervisor};
use crate::template::CommandTemplate;
use crate::transcript::Transcript;

/// One phase of per-item processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolve,
    ExtractAudio,
    Transcribe,
    Translate,
    Synthesize,
    Cleanup,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::ExtractAudio => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Synthesize => "synthesize",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal state of one pipeline item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Skipped(String),
    Failed(String),
    Cancelled,
}

/// Per-input working state. Lives from the moment the orchestrator picks an
/// input up until its outcome is recorded; never shared across items.
#[derive(Debug)]
pub struct PipelineItem {
    pub spec: String,
    pub media: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    pub transcript_json: Option<PathBuf>,
    pub stage: Stage,
    pub outcome: Option<ItemOutcome>,
}

impl PipelineItem {
    fn new(spec: String) -> Self {
        Self {
            spec,
            media: None,
            audio: None,
            transcript_json: None,
            stage: Stage::Resolve,
            outcome: None,
        }
    }

    fn display_name(&self) -> String {
        self.media
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.spec.clone())
    }
}

/// Command templates for every externally driven stage.
#[derive(Debug, Clone)]
pub struct StageTemplates {
    pub download: CommandTemplate,
    pub extract: CommandTemplate,
    pub transcribe: CommandTemplate,
    pub serve_backend: CommandTemplate,
    pub translate: CommandTemplate,
}

/// Immutable description of one batch: the ordered inputs plus a snapshot
/// of every option the stages consume. Built once, owned by the
/// orchestrator for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub inputs: Vec<String>,
    pub transcriber_enabled: bool,
    pub transcriber_model: String,
    pub backend: Option<Backend>,
    pub token: Option<String>,
    pub endpoint_override: Option<String>,
    pub model_override: Option<String>,
    pub local_model: String,
    pub gpu_layers: u32,
    pub port: u16,
    pub source_lang: String,
    pub target_lang: String,
    pub proxy: Option<String>,
    pub output_formats: Vec<OutputFormat>,
    pub dictionaries: Dictionaries,
    pub extra_prompt: String,
    pub templates: StageTemplates,
    pub document_path: PathBuf,
    pub health_timeout: Duration,
}

impl JobSpec {
    pub fn from_config(config: &Config, inputs: Vec<String>) -> Result<Self> {
        let backend = Backend::from_config_name(&config.backend.name)?;
        let token = non_empty(&config.backend.token);
        Ok(Self {
            inputs,
            transcriber_enabled: config.transcriber.enabled,
            transcriber_model: config.transcriber.model.clone(),
            backend,
            token,
            endpoint_override: non_empty(&config.backend.endpoint),
            model_override: non_empty(&config.backend.model_name),
            local_model: config.backend.local_model.clone(),
            gpu_layers: config.backend.gpu_layers,
            port: config.backend.port,
            source_lang: config.languages.source.clone(),
            target_lang: config.languages.target.clone(),
            proxy: config.proxy.address_opt().map(|s| s.to_string()),
            output_formats: config.output.formats.clone(),
            dictionaries: Dictionaries::default(),
            extra_prompt: String::new(),
            templates: StageTemplates {
                download: CommandTemplate::new(&config.downloader.command),
                extract: CommandTemplate::new(&config.media.extract_command),
                transcribe: CommandTemplate::new(&config.transcriber.command),
                serve_backend: CommandTemplate::new(&config.backend.serve_command),
                translate: CommandTemplate::new(&config.backend.translate_command),
            },
            document_path: config.backend.document.clone(),
            health_timeout: Duration::from_secs(config.backend.health_timeout_secs),
        })
    }

    /// Translation runs only with a backend selected and distinct languages.
    pub fn translation_requested(&self) -> bool {
        self.backend.is_some() && self.source_lang != self.target_lang
    }

    fn language_pair(&self) -> String {
        format!("{}2{}", self.source_lang, self.target_lang)
    }

    fn local_endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Batch-level result, reported exactly once through the status stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Success => self.succeeded += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
            ItemOutcome::Cancelled => self.cancelled = true,
        }
    }
}

/// Per-run translation state: the document is rewritten once before the
/// first translation, and a local server is started once and kept for the
/// rest of the batch.
struct TranslationSession {
    configured: bool,
    server: Option<ProcessHandle>,
}

impl TranslationSession {
    fn new() -> Self {
        Self {
            configured: false,
            server: None,
        }
    }
}

/// The pipeline state machine. Drives every item through
/// resolve → extract → transcribe → translate → synthesize, owns the
/// supervisor and the status stream, and honours the stop flag at every
/// stage boundary.
pub struct Orchestrator {
    layout: ProjectLayout,
    supervisor: Supervisor,
    resolver: InputResolver,
    status: StatusSink,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(config: &Config, status: StatusSink, cancel: CancelToken) -> Result<Self> {
        let layout = ProjectLayout::new(&config.project.root);
        let supervisor = Supervisor::new(status.clone());
        let proxy = config.proxy.address_opt().map(|s| s.to_string());
        let downloader = CommandDownloader::new(
            CommandTemplate::new(&config.downloader.command),
            proxy.clone(),
            supervisor.clone(),
        );
        Self::with_downloader(config, status, cancel, layout, supervisor, Box::new(downloader))
    }

    /// Constructor with an explicit downloader, used by tests to avoid the
    /// network.
    pub fn with_downloader(
        config: &Config,
        status: StatusSink,
        cancel: CancelToken,
        layout: ProjectLayout,
        supervisor: Supervisor,
        downloader: Box<dyn MediaDownloader>,
    ) -> Result<Self> {
        let resolver = InputResolver::new(
            layout.clone(),
            downloader,
            config.proxy.address_opt(),
            config.downloader.platform_api.clone(),
        )?;
        Ok(Self {
            layout,
            supervisor,
            resolver,
            status,
            cancel,
        })
    }

    /// Supervisor accessor for wiring the cancellation coordinator.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Run one batch to completion. Items are processed strictly in order;
    /// an item-scoped failure moves on to the next input, a stop request
    /// ends the batch, and a run-scoped error aborts it. The finished
    /// signal fires exactly once in every case, after all spawned
    /// processes are torn down.
    pub async fn run(&mut self, job: JobSpec) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        info!("Starting batch {} with {} inputs", run_id, job.inputs.len());

        let mut summary = BatchSummary::new(job.inputs.len());
        let mut session = TranslationSession::new();
        let mut run_error: Option<PipelineError> = None;

        match self.prepare(&job).await {
            Ok(()) => {
                for spec in &job.inputs {
                    if self.cancel.is_cancelled() {
                        self.status
                            .info("Stop requested; remaining inputs will not be processed");
                        summary.cancelled = true;
                        break;
                    }

                    let mut item = PipelineItem::new(spec.clone());
                    let outcome = match self.process_item(&job, &mut session, &mut item).await {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_item_scoped() => {
                            self.status.error(format!(
                                "{} failed during {}: {}",
                                item.display_name(),
                                item.stage,
                                e
                            ));
                            ItemOutcome::Failed(e.to_string())
                        }
                        Err(PipelineError::Cancelled) => ItemOutcome::Cancelled,
                        Err(e) => {
                            run_error = Some(e);
                            break;
                        }
                    };
                    debug!("Item {} finished as {:?}", item.display_name(), outcome);
                    summary.record(&outcome);
                    item.outcome = Some(outcome);
                    if summary.cancelled {
                        break;
                    }
                }
            }
            Err(e) => run_error = Some(e),
        }

        self.cleanup_backend(&mut session).await;
        self.supervisor.terminate_all().await;

        if let Some(e) = run_error {
            self.status.error(format!("Batch aborted: {}", e));
            self.status.finished(summary);
            return Err(e);
        }
        self.status.finished(summary.clone());
        Ok(summary)
    }

    async fn prepare(&self, job: &JobSpec) -> Result<()> {
        self.layout.ensure().await?;
        self.layout
            .apply_job_files(&job.dictionaries, &job.extra_prompt)
            .await?;
        Ok(())
    }

    async fn process_item(
        &self,
        job: &JobSpec,
        session: &mut TranslationSession,
        item: &mut PipelineItem,
    ) -> Result<ItemOutcome> {
        // Resolve
        self.cancel.checkpoint()?;
        item.stage = Stage::Resolve;
        self.status
            .stage_info(Stage::Resolve, format!("Resolving input {}", item.spec));
        let media = self.resolver.resolve(&item.spec).await?;
        item.media = Some(media.clone());
        let name = item.display_name();

        // Acquire the intermediate transcript: subtitle inputs are imported
        // directly, media inputs go through extraction and the speech engine.
        let transcript = if is_subtitle_file(&media) {
            self.cancel.checkpoint()?;
            item.stage = Stage::Transcribe;
            debug!("Importing subtitle file {}", media.display());
            Transcript::from_srt_file(&media, &job.source_lang).await?
        } else {
            self.cancel.checkpoint()?;
            item.stage = Stage::ExtractAudio;
            let audio = if is_raw_audio(&media) {
                debug!("Input already in raw audio format: {}", media.display());
                media.clone()
            } else {
                self.extract_audio(job, &media, &name).await?
            };
            item.audio = Some(audio.clone());

            self.cancel.checkpoint()?;
            item.stage = Stage::Transcribe;
            if !job.transcriber_enabled {
                self.status.info(format!(
                    "No transcription engine selected; skipping {}",
                    name
                ));
                return Ok(ItemOutcome::Skipped("transcription disabled".to_string()));
            }
            self.transcribe(job, &audio, &name).await?
        };

        let stem = file_stem(&media);
        let handoff = self
            .layout
            .engine_input_dir()
            .join(format!("{}.json", stem));
        transcript.save_json(&handoff).await?;
        item.transcript_json = Some(handoff.clone());

        // Translate
        self.cancel.checkpoint()?;
        item.stage = Stage::Translate;
        let translated = if !job.translation_requested() {
            self.status
                .info(format!("Translation disabled; keeping source text for {}", name));
            None
        } else {
            let backend = job.backend.ok_or_else(|| {
                PipelineError::Config("Translation requested without a backend".to_string())
            })?;
            self.ensure_backend_ready(job, session, backend).await?;
            Some(self.translate(job, backend, &stem, &name).await?)
        };

        // Synthesize
        self.cancel.checkpoint()?;
        item.stage = Stage::Synthesize;
        self.status.stage_info(
            Stage::Synthesize,
            format!("Writing subtitle artifacts for {}", name),
        );
        let artifacts = self
            .synthesize(job, &stem, &transcript, translated.as_ref())
            .await?;
        for artifact in &artifacts {
            self.status.info(format!("Wrote {}", artifact.display()));
        }

        self.status.info(format!("Completed {}", name));
        Ok(ItemOutcome::Success)
    }

    async fn extract_audio(&self, job: &JobSpec, media: &Path, name: &str) -> Result<PathBuf> {
        let audio = self
            .layout
            .cache_dir()
            .join(format!("{}.wav", file_stem(media)));
        self.status
            .stage_info(Stage::ExtractAudio, format!("Extracting audio from {}", name));

        let media_text = media.to_string_lossy().to_string();
        let audio_text = audio.to_string_lossy().to_string();
        let command = job
            .templates
            .extract
            .render(&[("input", &media_text), ("output", &audio_text)], &[])?;

        let handle = self.supervisor.start(&command).await.map_err(|e| {
            PipelineError::Extraction(format!("Failed to start audio extractor: {}", e))
        })?;
        match self.supervisor.wait(handle).await? {
            ExitOutcome::Exited(status) if status.success() => {}
            ExitOutcome::Exited(status) => {
                return Err(PipelineError::Extraction(format!(
                    "Audio extractor exited with {} for {}",
                    status, name
                )))
            }
            ExitOutcome::Terminated => return Err(PipelineError::Cancelled),
        }
        self.cancel.checkpoint()?;

        if !audio.exists() {
            return Err(PipelineError::Extraction(format!(
                "Audio extraction produced no output for {}",
                name
            )));
        }
        Ok(audio)
    }

    async fn transcribe(&self, job: &JobSpec, audio: &Path, name: &str) -> Result<Transcript> {
        if job.transcriber_model.trim().is_empty() {
            return Err(PipelineError::Transcription(
                "No speech model configured".to_string(),
            ));
        }

        self.status
            .stage_info(Stage::Transcribe, format!("Transcribing {}", name));

        let output_base = audio.with_extension("");
        let audio_text = audio.to_string_lossy().to_string();
        let base_text = output_base.to_string_lossy().to_string();
        let command = job.templates.transcribe.render(
            &[
                ("model", &job.transcriber_model),
                ("input", &audio_text),
                ("lang", &job.source_lang),
                ("output_base", &base_text),
            ],
            &[],
        )?;

        let handle = self.supervisor.start(&command).await.map_err(|e| {
            PipelineError::Transcription(format!("Failed to start speech engine: {}", e))
        })?;
        match self.supervisor.wait(handle).await? {
            ExitOutcome::Exited(status) if status.success() => {}
            ExitOutcome::Exited(status) => {
                return Err(PipelineError::Transcription(format!(
                    "Speech engine exited with {} for {}",
                    status, name
                )))
            }
            ExitOutcome::Terminated => return Err(PipelineError::Cancelled),
        }
        self.cancel.checkpoint()?;

        let srt = output_base.with_extension("srt");
        if !srt.exists() {
            return Err(PipelineError::Transcription(format!(
                "Speech engine produced no subtitle output for {}",
                name
            )));
        }
        Transcript::from_srt_file(&srt, &job.source_lang).await
    }

    /// Route the engine configuration and bring a local server up. The
    /// document rewrite happens once per run; the server survives until the
    /// cleanup stage so later items skip the cold start.
    async fn ensure_backend_ready(
        &self,
        job: &JobSpec,
        session: &mut TranslationSession,
        backend: Backend,
    ) -> Result<()> {
        if !session.configured {
            let mut document = ConfigDocument::load(&job.document_path)?;

            if backend.kind() == BackendKind::HostedApi && job.token.is_none() {
                let existing = document
                    .get_field(backend.document_anchor(), "- token")
                    .unwrap_or_default();
                if existing.is_empty() {
                    return Err(PipelineError::BackendUnavailable(format!(
                        "No API token configured for backend {}",
                        backend.name()
                    )));
                }
            }

            let selection = BackendSelection {
                backend,
                token: job.token.clone(),
                endpoint_override: job.endpoint_override.clone(),
                model_override: job.model_override.clone(),
                local_endpoint: match backend.kind() {
                    BackendKind::LocalServer => Some(job.local_endpoint()),
                    BackendKind::HostedApi => None,
                },
                proxy: job.proxy.clone(),
                language_pair: job.language_pair(),
            };
            document.apply_selection(&selection)?;
            document.save()?;
            session.configured = true;
            self.status.info(format!(
                "Engine configuration routed at backend {}",
                backend.name()
            ));
        }

        if backend.kind() == BackendKind::LocalServer && session.server.is_none() {
            if job.local_model.trim().is_empty() {
                return Err(PipelineError::BackendUnavailable(
                    "No local model file configured".to_string(),
                ));
            }

            let gpu_layers = job.gpu_layers.to_string();
            let port = job.port.to_string();
            let command = job.templates.serve_backend.render(
                &[
                    ("model", &job.local_model),
                    ("gpu_layers", &gpu_layers),
                    ("port", &port),
                ],
                &[],
            )?;

            self.status.info(format!(
                "Starting local translation backend on port {}",
                job.port
            ));
            let handle = self.supervisor.start(&command).await.map_err(|e| {
                PipelineError::BackendUnavailable(format!("Failed to start local backend: {}", e))
            })?;
            session.server = Some(handle);

            health::wait_until_healthy(&job.local_endpoint(), job.health_timeout, &self.cancel)
                .await?;
        }
        Ok(())
    }

    async fn translate(
        &self,
        job: &JobSpec,
        backend: Backend,
        stem: &str,
        name: &str,
    ) -> Result<Transcript> {
        self.status.stage_info(
            Stage::Translate,
            format!("Translating {} via {}", name, backend.name()),
        );

        let project_text = self.layout.root().to_string_lossy().to_string();
        let document_text = job.document_path.to_string_lossy().to_string();
        let command = job.templates.translate.render(
            &[
                ("project", &project_text),
                ("config", &document_text),
                ("translator", backend.engine_driver()),
            ],
            &[],
        )?;

        let handle = self.supervisor.start(&command).await.map_err(|e| {
            PipelineError::Translation(format!("Failed to start translation engine: {}", e))
        })?;
        match self.supervisor.wait(handle).await? {
            ExitOutcome::Exited(status) if status.success() => {}
            ExitOutcome::Exited(status) => {
                return Err(PipelineError::Translation(format!(
                    "Translation engine exited with {} for {}",
                    status, name
                )))
            }
            ExitOutcome::Terminated => return Err(PipelineError::Cancelled),
        }
        self.cancel.checkpoint()?;

        let output = self
            .layout
            .engine_output_dir()
            .join(format!("{}.json", stem));
        if !output.exists() {
            return Err(PipelineError::Translation(format!(
                "Translation engine produced no output for {}",
                name
            )));
        }
        Transcript::load_json(&output).await
    }

    async fn synthesize(
        &self,
        job: &JobSpec,
        stem: &str,
        transcript: &Transcript,
        translated: Option<&Transcript>,
    ) -> Result<Vec<PathBuf>> {
        let cache = self.layout.cache_dir();
        let mut artifacts = Vec::new();

        for format in effective_formats(&job.output_formats, translated.is_some()) {
            let path = match format {
                OutputFormat::SourceSrt => {
                    let path = cache.join(format!("{}.{}.srt", stem, job.source_lang));
                    subtitle::generate_srt(transcript, &path).await?;
                    path
                }
                OutputFormat::SourceLrc => {
                    let path = cache.join(format!("{}.{}.lrc", stem, job.source_lang));
                    subtitle::generate_lrc(transcript, &path).await?;
                    path
                }
                OutputFormat::TranslatedSrt => {
                    let translated = translated.ok_or_else(|| {
                        PipelineError::Translation(
                            "Translated subtitle requested without a translation".to_string(),
                        )
                    })?;
                    let path = cache.join(format!("{}.{}.srt", stem, job.target_lang));
                    subtitle::generate_srt(translated, &path).await?;
                    path
                }
                OutputFormat::TranslatedLrc => {
                    let translated = translated.ok_or_else(|| {
                        PipelineError::Translation(
                            "Translated lyrics requested without a translation".to_string(),
                        )
                    })?;
                    let path = cache.join(format!("{}.{}.lrc", stem, job.target_lang));
                    subtitle::generate_lrc(translated, &path).await?;
                    path
                }
                OutputFormat::BilingualSrt => {
                    let translated = translated.ok_or_else(|| {
                        PipelineError::Translation(
                            "Bilingual subtitle requested without a translation".to_string(),
                        )
                    })?;
                    let path = cache.join(format!(
                        "{}.{}-{}.srt",
                        stem, job.source_lang, job.target_lang
                    ));
                    subtitle::generate_bilingual_srt(transcript, translated, &path).await?;
                    path
                }
            };
            artifacts.push(path);
        }

        Ok(artifacts)
    }

    /// Cleanup stage: tear the local backend down once, after the last item
    /// that needed it.
    async fn cleanup_backend(&self, session: &mut TranslationSession) {
        if let Some(handle) = session.server.take() {
            self.status
                .stage_info(Stage::Cleanup, "Stopping local translation backend");
            self.supervisor.terminate(handle).await;
        }
    }
}

/// Artifact set actually synthesized: without a translation the requested
/// set degrades to its source-language subset, at minimum the source SRT.
fn effective_formats(requested: &[OutputFormat], has_translation: bool) -> Vec<OutputFormat> {
    let mut formats: Vec<OutputFormat> = Vec::new();
    for format in requested {
        if (has_translation || !format.needs_translation()) && !formats.contains(format) {
            formats.push(*format);
        }
    }
    if formats.is_empty() {
        formats.push(OutputFormat::SourceSrt);
    }
    formats
}

fn is_subtitle_file(path: &Path) -> bool {
    matches_extension(path, "srt")
}

fn is_raw_audio(path: &Path) -> bool {
    matches_extension(path, "wav")
}

fn matches_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "item".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Resolve.label(), "resolve");
        assert_eq!(Stage::ExtractAudio.to_string(), "extract");
        assert_eq!(Stage::Cleanup.label(), "cleanup");
    }

    #[test]
    fn test_file_kind_checks() {
        assert!(is_subtitle_file(Path::new("a/b/sub.SRT")));
        assert!(!is_subtitle_file(Path::new("a/b/clip.mp4")));
        assert!(is_raw_audio(Path::new("x.wav")));
        assert!(!is_raw_audio(Path::new("x.mp3")));
    }

    #[test]
    fn test_effective_formats_without_translation() {
        let requested = vec![
            OutputFormat::TranslatedSrt,
            OutputFormat::TranslatedLrc,
            OutputFormat::SourceLrc,
        ];
        assert_eq!(
            effective_formats(&requested, false),
            vec![OutputFormat::SourceLrc]
        );
        // Nothing source-language requested still yields the source SRT.
        assert_eq!(
            effective_formats(&[OutputFormat::TranslatedSrt], false),
            vec![OutputFormat::SourceSrt]
        );
        assert_eq!(
            effective_formats(&requested, true),
            vec![
                OutputFormat::TranslatedSrt,
                OutputFormat::TranslatedLrc,
                OutputFormat::SourceLrc
            ]
        );
    }

    #[test]
    fn test_summary_accounting() {
        let mut summary = BatchSummary::new(4);
        summary.record(&ItemOutcome::Success);
        summary.record(&ItemOutcome::Failed("boom".to_string()));
        summary.record(&ItemOutcome::Skipped("disabled".to_string()));
        summary.record(&ItemOutcome::Cancelled);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_translation_requested_rules() {
        let config = Config::default();
        let mut job = JobSpec::from_config(&config, vec![]).unwrap();
        assert!(job.backend.is_none());
        assert!(!job.translation_requested());

        job.backend = Some(Backend::Sakura010);
        assert!(job.translation_requested());

        job.target_lang = job.source_lang.clone();
        assert!(!job.translation_requested());
    }
}
