use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::ValidationError;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadFormat {
    Best,
    Video,
    Audio,
}

impl Default for DownloadFormat {
    fn default() -> Self {
        Self::Best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    Mp4,
    Mkv,
    Webm,
    Flv,
    Avi,
}

impl VideoContainer {
    pub const ALL: [VideoContainer; 5] = [
        Self::Mp4,
        Self::Mkv,
        Self::Webm,
        Self::Flv,
        Self::Avi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Flv => "flv",
            Self::Avi => "avi",
        }
    }
}

impl Default for VideoContainer {
    fn default() -> Self {
        Self::Mp4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "144p")]
    Q144,
    #[serde(rename = "240p")]
    Q240,
    #[serde(rename = "360p")]
    Q360,
    #[serde(rename = "480p")]
    Q480,
    #[serde(rename = "720p")]
    Q720,
    #[serde(rename = "1080p")]
    Q1080,
    #[serde(rename = "1440p")]
    Q1440,
    #[serde(rename = "2160p")]
    Q2160,
}

impl VideoQuality {
    pub const ALL: [VideoQuality; 8] = [
        Self::Q144,
        Self::Q240,
        Self::Q360,
        Self::Q480,
        Self::Q720,
        Self::Q1080,
        Self::Q1440,
        Self::Q2160,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Q144 => "144p",
            Self::Q240 => "240p",
            Self::Q360 => "360p",
            Self::Q480 => "480p",
            Self::Q720 => "720p",
            Self::Q1080 => "1080p",
            Self::Q1440 => "1440p",
            Self::Q2160 => "2160p",
        }
    }

    /// Height ceiling in pixels, derived from the label.
    pub fn height_px(self) -> u32 {
        self.label()
            .trim_end_matches('p')
            .parse()
            .unwrap_or_default()
    }
}

impl Default for VideoQuality {
    fn default() -> Self {
        Self::Q1080
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Opus,
    Vorbis,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::M4a,
        Self::Wav,
        Self::Flac,
        Self::Opus,
        Self::Vorbis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::Mp3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioQuality {
    #[serde(rename = "64k")]
    K64,
    #[serde(rename = "128k")]
    K128,
    #[serde(rename = "192k")]
    K192,
    #[serde(rename = "256k")]
    K256,
    #[serde(rename = "320k")]
    K320,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 5] = [Self::K64, Self::K128, Self::K192, Self::K256, Self::K320];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::K64 => "64k",
            Self::K128 => "128k",
            Self::K192 => "192k",
            Self::K256 => "256k",
            Self::K320 => "320k",
        }
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self::K128
    }
}

macro_rules! display_as_str {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.$method())
            }
        })*
    };
}

display_as_str!(
    VideoContainer => as_str,
    VideoQuality => label,
    AudioFormat => as_str,
    AudioQuality => as_str,
);

/// Snapshot of the user's choices taken when a queue starts. Later edits to
/// the form never reach a running queue.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfiguration {
    pub format: DownloadFormat,
    pub video_container: VideoContainer,
    pub video_quality: VideoQuality,
    pub audio_format: AudioFormat,
    pub audio_quality: AudioQuality,
    pub embed_subtitles: bool,
    pub subtitle_languages: String,
    pub embed_metadata: bool,
    pub skip_existing: bool,
    pub speed_limit: String,
    pub throttle_rate: String,
    pub filename_template: String,
    pub output_directory: Option<PathBuf>,
    pub batch_mode: bool,
    pub auto_open_folder: bool,
}

impl Default for DownloadConfiguration {
    fn default() -> Self {
        DownloadForm::default().snapshot()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    /// 1-based position in the queue.
    pub index: usize,
    pub total: usize,
}

impl DownloadJob {
    pub fn from_urls(urls: &[String]) -> Vec<DownloadJob> {
        let total = urls.len();
        urls.iter()
            .enumerate()
            .map(|(i, url)| DownloadJob {
                url: url.clone(),
                index: i + 1,
                total,
            })
            .collect()
    }
}

/// Editable form state behind the main window. Everything except the URL
/// fields is persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadForm {
    #[serde(skip)]
    pub single_url: String,
    #[serde(skip)]
    pub batch_urls: String,
    pub batch_mode: bool,
    pub format: DownloadFormat,
    pub video_container: VideoContainer,
    pub video_quality: VideoQuality,
    pub audio_format: AudioFormat,
    pub audio_quality: AudioQuality,
    pub embed_subtitles: bool,
    pub subtitle_languages: String,
    pub embed_metadata: bool,
    pub skip_existing: bool,
    pub speed_limit: String,
    pub throttle_rate: String,
    pub filename_template: String,
    pub output_directory: Option<PathBuf>,
    pub auto_open_folder: bool,
}

impl Default for DownloadForm {
    fn default() -> Self {
        Self {
            single_url: String::new(),
            batch_urls: String::new(),
            batch_mode: false,
            format: DownloadFormat::default(),
            video_container: VideoContainer::default(),
            video_quality: VideoQuality::default(),
            audio_format: AudioFormat::default(),
            audio_quality: AudioQuality::default(),
            embed_subtitles: false,
            subtitle_languages: "all".to_string(),
            embed_metadata: false,
            skip_existing: false,
            speed_limit: String::new(),
            throttle_rate: String::new(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            output_directory: dirs::download_dir(),
            auto_open_folder: false,
        }
    }
}

impl DownloadForm {
    pub fn snapshot(&self) -> DownloadConfiguration {
        DownloadConfiguration {
            format: self.format,
            video_container: self.video_container,
            video_quality: self.video_quality,
            audio_format: self.audio_format,
            audio_quality: self.audio_quality,
            embed_subtitles: self.embed_subtitles,
            subtitle_languages: self.subtitle_languages.clone(),
            embed_metadata: self.embed_metadata,
            skip_existing: self.skip_existing,
            speed_limit: self.speed_limit.clone(),
            throttle_rate: self.throttle_rate.clone(),
            filename_template: self.filename_template.clone(),
            output_directory: self.output_directory.clone(),
            batch_mode: self.batch_mode,
            auto_open_folder: self.auto_open_folder,
        }
    }

    /// URLs to enqueue. Batch input is split on newlines with blank lines
    /// dropped; single mode requires a non-blank URL.
    pub fn urls(&self) -> Result<Vec<String>, ValidationError> {
        if self.batch_mode {
            let urls = split_batch(&self.batch_urls);
            if urls.is_empty() {
                return Err(ValidationError::NoUrls);
            }
            Ok(urls)
        } else {
            let url = self.single_url.trim();
            if url.is_empty() {
                return Err(ValidationError::BlankUrl);
            }
            Ok(vec![url.to_string()])
        }
    }
}

pub fn split_batch(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
