use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a batch of inputs through the full pipeline
    Run {
        /// Input specifications: local media or subtitle files, video URLs,
        /// or platform video IDs
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Translation backend override (see `backends`); "none" disables
        /// translation
        #[arg(long)]
        backend: Option<String>,

        /// API token override for hosted backends
        #[arg(long)]
        token: Option<String>,

        /// Target language override
        #[arg(long)]
        target_lang: Option<String>,

        /// Output format override, repeatable: source-srt, translated-srt,
        /// bilingual-srt, source-lrc, translated-lrc
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<String>,

        /// Pre-translation dictionary file (term and replacement per line)
        #[arg(long)]
        dict_before: Option<PathBuf>,

        /// Engine dictionary file
        #[arg(long)]
        dict_gpt: Option<PathBuf>,

        /// Post-translation dictionary file
        #[arg(long)]
        dict_after: Option<PathBuf>,

        /// Extra free-text instruction handed to the translation engine
        #[arg(long)]
        extra_prompt: Option<String>,
    },

    /// Remove intermediate and cached files under the project tree
    Clean,

    /// List known translation backends and their routing
    Backends,

    /// Write a default configuration file and engine document
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}
