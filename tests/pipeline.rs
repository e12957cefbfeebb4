//! End-to-end batch scenarios driven through the public pipeline API, with
//! the external engines replaced by small shell scripts.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use jimaku::backend::document::write_default_document;
use jimaku::cancel::{CancelCoordinator, CancelToken};
use jimaku::config::Config;
use jimaku::pipeline::{JobSpec, Orchestrator, Stage};
use jimaku::status::{StatusEvent, StatusLevel, StatusLine, StatusSink};
use jimaku::subtitle::OutputFormat;

const SAMPLE_SRT: &str = "1\n00:00:00,500 --> 00:00:02,000\nhello\n\n2\n00:00:02,500 --> 00:00:05,250\nworld\n\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

fn base_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.project.root = root.join("project");
    config.backend.document = root.join("project").join("engine.yaml");
    config.backend.name = "none".to_string();
    config
}

fn drain_lines(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StatusEvent>) -> (Vec<StatusLine>, usize) {
    let mut lines = Vec::new();
    let mut finished = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            StatusEvent::Line(line) => lines.push(line),
            StatusEvent::Finished(_) => finished += 1,
        }
    }
    (lines, finished)
}

fn stage_lines(lines: &[StatusLine]) -> Vec<Stage> {
    lines.iter().filter_map(|l| l.stage).collect()
}

fn error_count(lines: &[StatusLine]) -> usize {
    lines
        .iter()
        .filter(|l| l.level == StatusLevel::Error)
        .count()
}

/// A local subtitle file with translation disabled runs only the resolve
/// and synthesize stages and succeeds without touching any engine.
#[tokio::test]
async fn subtitle_input_without_translation_synthesizes_directly() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("lecture.srt");
    input.write_str(SAMPLE_SRT).unwrap();

    let config = base_config(temp.path());
    let (status, mut rx) = StatusSink::channel();
    let cancel = CancelToken::new();
    let mut orchestrator = Orchestrator::new(&config, status, cancel).unwrap();

    let job = JobSpec::from_config(
        &config,
        vec![input.path().to_string_lossy().to_string()],
    )
    .unwrap();
    let summary = orchestrator.run(job).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    let (lines, finished) = drain_lines(&mut rx);
    assert_eq!(finished, 1);
    assert_eq!(stage_lines(&lines), vec![Stage::Resolve, Stage::Synthesize]);
    assert_eq!(error_count(&lines), 0);

    // Only the source-language artifact exists, byte-equal to a canonical
    // regeneration of the input cues.
    temp.child("project/cache/lecture.ja.srt").assert(SAMPLE_SRT);
    assert!(!temp.child("project/cache/lecture.zh-cn.srt").path().exists());

    // With translation disabled the engine document is never written.
    assert!(!config.backend.document.exists());
}

/// A URL input whose download fails marks that item failed; the batch still
/// finishes and reports exactly one error line for it.
#[tokio::test]
async fn failed_download_fails_item_but_batch_finishes() {
    let temp = TempDir::new().unwrap();
    let mut config = base_config(temp.path());
    config.downloader.command =
        "/nonexistent-downloader-4711 {proxy_args} -o {output} {url}".to_string();

    let (status, mut rx) = StatusSink::channel();
    let cancel = CancelToken::new();
    let mut orchestrator = Orchestrator::new(&config, status, cancel).unwrap();

    let job = JobSpec::from_config(
        &config,
        vec!["https://example.com/video.mp4".to_string()],
    )
    .unwrap();
    let summary = orchestrator.run(job).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);
    assert!(!summary.cancelled);

    let (lines, finished) = drain_lines(&mut rx);
    assert_eq!(finished, 1);
    assert_eq!(error_count(&lines), summary.failed);
    assert!(lines
        .iter()
        .any(|l| l.level == StatusLevel::Error && l.message.contains("resolve")));

    // A failed item synthesizes nothing.
    let cache = temp.child("project/cache");
    let artifacts = std::fs::read_dir(cache.path())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(artifacts, 0);
}

/// Two items against a hosted backend: the engine document is rewritten
/// once, the translation engine runs per item, and both items produce
/// translated artifacts.
#[tokio::test]
async fn hosted_backend_rewrites_document_once_for_two_items() {
    let temp = TempDir::new().unwrap();
    temp.child("first.srt").write_str(SAMPLE_SRT).unwrap();
    temp.child("second.srt").write_str(SAMPLE_SRT).unwrap();

    let mut config = base_config(temp.path());
    config.backend.name = "gpt35-0613".to_string();
    config.backend.token = "sk-test".to_string();

    // Fake translation engine: "translates" every pending hand-off
    // transcript by copying it to the output directory.
    let engine = write_script(
        temp.path(),
        "fake-engine",
        r#"for f in "$1"/gt_input/*.json; do cp "$f" "$1"/gt_output/; done"#,
    );
    config.backend.translate_command =
        format!("{} {{project}} {{translator}}", engine.display());

    std::fs::create_dir_all(config.project.root.clone()).unwrap();
    write_default_document(&config.backend.document).unwrap();

    let (status, mut rx) = StatusSink::channel();
    let cancel = CancelToken::new();
    let mut orchestrator = Orchestrator::new(&config, status, cancel).unwrap();

    let job = JobSpec::from_config(
        &config,
        vec![
            temp.child("first.srt").path().to_string_lossy().to_string(),
            temp.child("second.srt").path().to_string_lossy().to_string(),
        ],
    )
    .unwrap();
    let summary = orchestrator.run(job).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);

    let (lines, finished) = drain_lines(&mut rx);
    assert_eq!(finished, 1);
    assert_eq!(error_count(&lines), 0);

    // The document rewrite happened exactly once, before the first
    // translation, and routed the GPT35 block at the configured token.
    let routed: Vec<_> = lines
        .iter()
        .filter(|l| l.message.contains("Engine configuration routed"))
        .collect();
    assert_eq!(routed.len(), 1);
    let document = std::fs::read_to_string(&config.backend.document).unwrap();
    assert!(document.contains("- token: sk-test"));

    // The translate stage ran once per item.
    let translate_lines = stage_lines(&lines)
        .into_iter()
        .filter(|s| *s == Stage::Translate)
        .count();
    assert_eq!(translate_lines, 2);

    for stem in ["first", "second"] {
        assert!(temp
            .child(format!("project/cache/{}.zh-cn.srt", stem))
            .path()
            .exists());
        assert!(temp
            .child(format!("project/cache/{}.zh-cn.lrc", stem))
            .path()
            .exists());
    }
}

/// Stop requested while the second of three items sits in the speech
/// engine's blocking wait: the first item finishes, the second unwinds as
/// cancelled once the wait returns, the third never starts, and no
/// supervised process survives.
#[tokio::test]
async fn stop_during_transcription_cancels_batch_and_kills_processes() {
    let temp = TempDir::new().unwrap();
    for name in ["first.wav", "hang.wav", "third.wav"] {
        temp.child(name).write_str("not really audio").unwrap();
    }

    let mut config = base_config(temp.path());
    // Raw-audio inputs skip extraction; the fake speech engine stalls on
    // the second item until it is killed.
    let whisper = write_script(
        temp.path(),
        "fake-whisper",
        r#"case "$1" in *hang*) sleep 30 ;; esac
printf '1\n00:00:00,000 --> 00:00:01,000\nhello\n\n' > "$2.srt""#,
    );
    config.transcriber.command = format!("{} {{input}} {{output_base}}", whisper.display());

    let (status, mut rx) = StatusSink::channel();
    let cancel = CancelToken::new();
    let mut orchestrator = Orchestrator::new(&config, status, cancel.clone()).unwrap();
    let supervisor = orchestrator.supervisor().clone();
    let coordinator = CancelCoordinator::new(cancel, supervisor.clone());

    let job = JobSpec::from_config(
        &config,
        vec![
            temp.child("first.wav").path().to_string_lossy().to_string(),
            temp.child("hang.wav").path().to_string_lossy().to_string(),
            temp.child("third.wav").path().to_string_lossy().to_string(),
        ],
    )
    .unwrap();

    let run = tokio::spawn(async move { orchestrator.run(job).await });

    // Wait until the second item is inside the engine, then stop.
    let mut observed = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(20), rx.recv())
            .await
            .expect("pipeline stalled before reaching the second item")
            .expect("status stream closed early");
        if let StatusEvent::Line(line) = event {
            let hit = line.stage == Some(Stage::Transcribe) && line.message.contains("hang");
            observed.push(line);
            if hit {
                break;
            }
        }
    }
    // Give the spawn that follows the stage line a moment to register.
    tokio::time::sleep(Duration::from_millis(300)).await;
    coordinator.request_stop().await;

    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.cancelled);

    let (rest, finished) = drain_lines(&mut rx);
    assert_eq!(finished, 1);
    observed.extend(rest);

    // The third input never entered the pipeline.
    let resolve_count = observed
        .iter()
        .filter(|l| l.stage == Some(Stage::Resolve))
        .count();
    assert_eq!(resolve_count, 2);
    assert!(!observed.iter().any(|l| l.message.contains("third.wav")));

    // Every supervised process is gone.
    assert_eq!(supervisor.running_count().await, 0);
}

/// Translation disabled means the requested translated formats degrade to
/// their source-language subset instead of invoking any backend.
#[tokio::test]
async fn disabled_translation_produces_source_artifacts_only() {
    let temp = TempDir::new().unwrap();
    temp.child("talk.srt").write_str(SAMPLE_SRT).unwrap();

    let mut config = base_config(temp.path());
    config.output.formats = vec![OutputFormat::TranslatedSrt, OutputFormat::SourceLrc];

    let (status, mut rx) = StatusSink::channel();
    let cancel = CancelToken::new();
    let mut orchestrator = Orchestrator::new(&config, status, cancel).unwrap();

    let job = JobSpec::from_config(
        &config,
        vec![temp.child("talk.srt").path().to_string_lossy().to_string()],
    )
    .unwrap();
    let summary = orchestrator.run(job).await.unwrap();
    assert_eq!(summary.succeeded, 1);

    let (lines, _) = drain_lines(&mut rx);
    assert!(!stage_lines(&lines).contains(&Stage::Translate));

    assert!(temp.child("project/cache/talk.ja.lrc").path().exists());
    assert!(!temp.child("project/cache/talk.zh-cn.srt").path().exists());
}
