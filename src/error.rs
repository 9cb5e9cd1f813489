//! Error types for the download queue.
//!
//! Every failure that reaches the user goes through [`QueueError`]; the
//! component errors convert into it with `?`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Downloader,
    PostProcessor,
}

impl Tool {
    pub fn binary_name(self) -> &'static str {
        match (self, cfg!(windows)) {
            (Self::Downloader, false) => "yt-dlp",
            (Self::Downloader, true) => "yt-dlp.exe",
            (Self::PostProcessor, false) => "ffmpeg",
            (Self::PostProcessor, true) => "ffmpeg.exe",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloader => f.write_str("yt-dlp"),
            Self::PostProcessor => f.write_str("ffmpeg"),
        }
    }
}

/// A required external tool is missing and could not be provisioned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("{tool} was not found and automatic installation is disabled")]
    NotFound { tool: Tool },

    #[error("{tool} cannot be installed automatically on this platform")]
    Unsupported { tool: Tool },

    #[error("failed to download {tool}: {reason}")]
    Download { tool: Tool, reason: String },

    #[error("failed to unpack {tool}: {reason}")]
    Extract { tool: Tool, reason: String },

    #[error("failed to install {tool} into {path}: {reason}")]
    Install {
        tool: Tool,
        path: PathBuf,
        reason: String,
    },

    #[error("no application data directory is available")]
    NoSupportDir,

    #[error("dependency check stopped unexpectedly")]
    CheckAborted,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a download folder.")]
    MissingOutputDirectory,

    #[error("No URLs found in batch input")]
    NoUrls,

    #[error("Please enter a valid URL")]
    BlankUrl,

    #[error("A download is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing path for {0}")]
    MissingToolPath(Tool),

    #[error("no output directory configured")]
    MissingOutputDirectory,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("process exited with {}", exit_description(.code))]
    NonZeroExit { code: Option<i32> },

    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    #[error("cancelled by user")]
    Cancelled,
}

fn exit_description(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Dependencies unavailable: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Dependencies are still being checked")]
    DependenciesPending,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Could not prepare download: {0}")]
    Build(#[from] BuildError),

    #[error("Process execution failed: {0}")]
    Run(#[from] RunError),

    #[error("Download failed for {url}: {source}")]
    Job {
        url: String,
        #[source]
        source: RunError,
    },
}

impl QueueError {
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Run(RunError::Cancelled)
                | Self::Job {
                    source: RunError::Cancelled,
                    ..
                }
        )
    }
}
