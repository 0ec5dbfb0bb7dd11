use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::prompt::ActionKind;

#[derive(Parser)]
#[command(
    name = "studytube",
    about = "Studytube - turn a video URL into a summary, introduction, answer, or quiz",
    version,
    long_about = "A CLI tool that downloads the audio of a video, transcribes it with Whisper, \
and asks an LLM backend to turn the transcript into study material: a one-paragraph summary, \
an engaging introduction, an answer to your question, or a three-question quiz."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the video in a single informative paragraph
    Summarize {
        /// Video URL to process
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Write an engaging introduction for the video
    Intro {
        /// Video URL to process
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Answer a question using the video transcript as grounding
    Ask {
        /// Video URL to process
        #[arg(value_name = "URL")]
        url: String,

        /// Question to answer from the transcript
        #[arg(value_name = "QUESTION", default_value = "")]
        question: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate three quiz questions from the video
    Quiz {
        /// Video URL to process
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Options shared by every study action.
#[derive(clap::Args)]
pub struct CommonArgs {
    /// Output file path (prints to console if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Language code for transcription (auto-detect if not specified)
    #[arg(short, long, value_name = "LANG", env = "STUDYTUBE_LANGUAGE")]
    pub language: Option<String>,
}

impl Commands {
    /// The `(url, action, common options)` triple for study actions,
    /// `None` for management commands.
    pub fn action(&self) -> Option<(&str, ActionKind, &CommonArgs)> {
        match self {
            Commands::Summarize { url, common } => Some((url, ActionKind::Summarize, common)),
            Commands::Intro { url, common } => Some((url, ActionKind::Introduce, common)),
            Commands::Ask {
                url,
                question,
                common,
            } => Some((url, ActionKind::Answer(question.clone()), common)),
            Commands::Quiz { url, common } => Some((url, ActionKind::Quiz, common)),
            Commands::Config { .. } => None,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON bundle with metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
