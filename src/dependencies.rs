//! Finding, and if needed installing, the downloader and the post-processor.
//!
//! Each tool is looked up in the bundled `tools/` directory beside the
//! executable, then in the application data directory, then on `PATH`.
//! Anything still missing is downloaded into the application data directory.

use anyhow::Context;
use bytes::Bytes;
use log::{debug, info};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zip::ZipArchive;

use crate::error::{DependencyError, Tool};

pub const APP_DIR_NAME: &str = "ytdl-queue";
pub const TOOLS_DIR_ENV: &str = "YTDL_QUEUE_TOOLS_DIR";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const YTDLP_RELEASES: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub downloader: PathBuf,
    /// Directory holding the post-processor, passed as `--ffmpeg-location`.
    pub post_processor_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// The download is the executable itself.
    Raw,
    /// The executable sits somewhere inside a zip archive.
    Zip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    pub url: String,
    pub packaging: Packaging,
}

impl ReleaseSource {
    fn new(url: impl Into<String>, packaging: Packaging) -> Self {
        Self {
            url: url.into(),
            packaging,
        }
    }
}

/// Where a tool can be downloaded from on the given platform.
pub fn release_source(tool: Tool, os: &str, arch: &str) -> Option<ReleaseSource> {
    match (tool, os, arch) {
        (Tool::Downloader, "macos", _) => Some(ReleaseSource::new(
            format!("{YTDLP_RELEASES}/yt-dlp_macos"),
            Packaging::Raw,
        )),
        (Tool::Downloader, "windows", _) => Some(ReleaseSource::new(
            format!("{YTDLP_RELEASES}/yt-dlp.exe"),
            Packaging::Raw,
        )),
        (Tool::Downloader, "linux", "x86_64") => Some(ReleaseSource::new(
            format!("{YTDLP_RELEASES}/yt-dlp_linux"),
            Packaging::Raw,
        )),
        (Tool::Downloader, "linux", "aarch64") => Some(ReleaseSource::new(
            format!("{YTDLP_RELEASES}/yt-dlp_linux_aarch64"),
            Packaging::Raw,
        )),
        (Tool::PostProcessor, "macos", _) => Some(ReleaseSource::new(
            "https://evermeet.cx/ffmpeg/getrelease/zip",
            Packaging::Zip,
        )),
        (Tool::PostProcessor, "windows", _) => Some(ReleaseSource::new(
            "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip",
            Packaging::Zip,
        )),
        _ => None,
    }
}

/// Network access used for provisioning.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> anyhow::Result<Bytes>;
}

/// Release archives run to ~100 MB, so the whole transfer has no deadline by
/// default. Only connecting is bounded.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    connect_timeout: Duration,
    timeout: Option<Duration>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            timeout: None,
        }
    }
}

impl HttpFetcher {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ytdl-queue/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .context("failed to build HTTP client")?;
        let response = client
            .get(url)
            .send()
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?;
        response.bytes().context("failed to read response body")
    }
}

pub struct Locator {
    bundled_dir: Option<PathBuf>,
    support_dir: Option<PathBuf>,
    search_path: bool,
    provision: bool,
    downloader_source: Option<ReleaseSource>,
    post_processor_source: Option<ReleaseSource>,
    fetcher: Box<dyn Fetcher>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator {
    pub fn new() -> Self {
        let bundled_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("tools")));
        let support_dir = std::env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join("bin")));
        let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);

        Self {
            bundled_dir,
            support_dir,
            search_path: true,
            provision: true,
            downloader_source: release_source(Tool::Downloader, os, arch),
            post_processor_source: release_source(Tool::PostProcessor, os, arch),
            fetcher: Box::new(HttpFetcher::default()),
        }
    }

    pub fn with_bundled_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.bundled_dir = dir;
        self
    }

    pub fn with_support_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.support_dir = dir;
        self
    }

    pub fn search_path(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    pub fn provision(mut self, enabled: bool) -> Self {
        self.provision = enabled;
        self
    }

    pub fn with_source(mut self, tool: Tool, source: Option<ReleaseSource>) -> Self {
        match tool {
            Tool::Downloader => self.downloader_source = source,
            Tool::PostProcessor => self.post_processor_source = source,
        }
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Resolves both tools, installing whichever is missing. Running it
    /// again once both exist touches neither the network nor the disk.
    pub fn locate(&self) -> Result<ToolPaths, DependencyError> {
        let downloader = self.resolve(Tool::Downloader)?;
        let post_processor = self.resolve(Tool::PostProcessor)?;
        let post_processor_dir = post_processor
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        info!(
            "using {} and post-processor in {}",
            downloader.display(),
            post_processor_dir.display()
        );
        Ok(ToolPaths {
            downloader,
            post_processor_dir,
        })
    }

    fn resolve(&self, tool: Tool) -> Result<PathBuf, DependencyError> {
        if let Some(path) = self.find_existing(tool)? {
            return Ok(path);
        }
        if !self.provision {
            return Err(DependencyError::NotFound { tool });
        }
        let dir = self
            .support_dir
            .as_deref()
            .ok_or(DependencyError::NoSupportDir)?;
        self.install(tool, dir)
    }

    fn find_existing(&self, tool: Tool) -> Result<Option<PathBuf>, DependencyError> {
        let local = [self.bundled_dir.as_deref(), self.support_dir.as_deref()];
        for dir in local.into_iter().flatten() {
            let candidate = dir.join(tool.binary_name());
            if candidate.is_file() {
                ensure_executable(&candidate, tool)?;
                debug!("found {} at {}", tool, candidate.display());
                return Ok(Some(candidate));
            }
        }

        if self.search_path {
            if let Ok(path) = which::which(tool.binary_name()) {
                debug!("found {} on PATH at {}", tool, path.display());
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn install(&self, tool: Tool, dir: &Path) -> Result<PathBuf, DependencyError> {
        let source = match tool {
            Tool::Downloader => self.downloader_source.as_ref(),
            Tool::PostProcessor => self.post_processor_source.as_ref(),
        }
        .ok_or(DependencyError::Unsupported { tool })?;

        fs::create_dir_all(dir).map_err(|e| install_error(tool, dir, e))?;

        info!("downloading {} from {}", tool, source.url);
        let payload = self
            .fetcher
            .fetch(&source.url)
            .map_err(|e| DependencyError::Download {
                tool,
                reason: format!("{e:#}"),
            })?;

        let contents = match source.packaging {
            Packaging::Raw => payload,
            Packaging::Zip => extract_from_zip(&payload, tool)?,
        };

        let target = dir.join(tool.binary_name());
        write_executable(&target, &contents, tool)?;
        info!("installed {} to {}", tool, target.display());
        Ok(target)
    }
}

fn extract_from_zip(archive: &[u8], tool: Tool) -> Result<Bytes, DependencyError> {
    let extract_error = |reason: String| DependencyError::Extract { tool, reason };

    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(|e| extract_error(e.to_string()))?;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| extract_error(e.to_string()))?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        let file_name = name.rsplit('/').next().unwrap_or_default();
        if file_name.eq_ignore_ascii_case(tool.binary_name()) {
            // The header size is untrusted; let the buffer grow as read.
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|e| extract_error(e.to_string()))?;
            return Ok(Bytes::from(contents));
        }
    }

    Err(extract_error(format!(
        "{} not found in archive",
        tool.binary_name()
    )))
}

fn write_executable(target: &Path, contents: &[u8], tool: Tool) -> Result<(), DependencyError> {
    let temp = target.with_extension("part");
    fs::write(&temp, contents).map_err(|e| install_error(tool, target, e))?;
    set_executable(&temp).map_err(|e| install_error(tool, target, e))?;
    fs::rename(&temp, target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        install_error(tool, target, e)
    })
}

fn ensure_executable(path: &Path, tool: Tool) -> Result<(), DependencyError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .map_err(|e| install_error(tool, path, e))?
            .permissions()
            .mode();
        if mode & 0o111 == 0 {
            set_executable(path).map_err(|e| install_error(tool, path, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = (path, tool);
    Ok(())
}

fn set_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn install_error(tool: Tool, path: &Path, e: std::io::Error) -> DependencyError {
    DependencyError::Install {
        tool,
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
