//! Jimaku - batch media-to-subtitle translation pipeline
//!
//! A Rust implementation of a batch pipeline that turns local media files,
//! subtitle files, video URLs and platform video IDs into translated
//! subtitle and lyric files by orchestrating external engines: a
//! downloader, ffmpeg, a whisper-cpp speech engine, and a translation
//! engine routed at either a locally hosted model server or a hosted API.

pub mod backend;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod project;
pub mod resolve;
pub mod status;
pub mod subtitle;
pub mod supervisor;
pub mod template;
pub mod transcript;
