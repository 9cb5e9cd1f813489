use crate::dependencies::ToolPaths;
use crate::error::{BuildError, Tool};
use crate::models::{DownloadConfiguration, DownloadFormat, DownloadJob, DEFAULT_FILENAME_TEMPLATE};

/// Argument vector for one downloader invocation. The URL is always last.
pub fn build(
    config: &DownloadConfiguration,
    job: &DownloadJob,
    tools: &ToolPaths,
) -> Result<Vec<String>, BuildError> {
    if tools.downloader.as_os_str().is_empty() {
        return Err(BuildError::MissingToolPath(Tool::Downloader));
    }
    if tools.post_processor_dir.as_os_str().is_empty() {
        return Err(BuildError::MissingToolPath(Tool::PostProcessor));
    }

    let mut args: Vec<String> = vec![
        "--newline".into(),
        "--progress".into(),
        "--no-warnings".into(),
        "-o".into(),
        output_template(config, job)?,
        "--ffmpeg-location".into(),
        tools.post_processor_dir.to_string_lossy().into_owned(),
    ];

    match config.format {
        DownloadFormat::Best => {
            args.extend(["-f".into(), "bv*+ba/best".into()]);
        }
        DownloadFormat::Video => {
            args.extend([
                "-f".into(),
                format!(
                    "bestvideo[height<={}]+bestaudio",
                    config.video_quality.height_px()
                ),
                "--merge-output-format".into(),
                config.video_container.as_str().into(),
            ]);
        }
        DownloadFormat::Audio => {
            args.extend([
                "-f".into(),
                "bestaudio".into(),
                "--extract-audio".into(),
                "--audio-format".into(),
                config.audio_format.as_str().into(),
                "--audio-quality".into(),
                config.audio_quality.as_str().into(),
            ]);
        }
    }

    if let Some(limit) = non_blank(&config.speed_limit) {
        args.extend(["--limit-rate".into(), limit.into()]);
    }
    if let Some(rate) = non_blank(&config.throttle_rate) {
        args.extend(["--throttled-rate".into(), rate.into()]);
    }
    if config.skip_existing {
        args.push("--no-overwrites".into());
    }
    if config.embed_subtitles {
        let langs = non_blank(&config.subtitle_languages).unwrap_or("all");
        args.extend([
            "--write-subs".into(),
            "--embed-subs".into(),
            "--sub-langs".into(),
            langs.into(),
        ]);
    }
    if config.embed_metadata {
        args.extend(["--embed-metadata".into(), "--embed-thumbnail".into()]);
    }

    args.push(job.url.clone());
    Ok(args)
}

/// `-o` value for a job. In batch mode the template is prefixed with the
/// queue position and the video id so two items with the same title never
/// write to the same file.
pub fn output_template(
    config: &DownloadConfiguration,
    job: &DownloadJob,
) -> Result<String, BuildError> {
    let dir = config
        .output_directory
        .as_ref()
        .ok_or(BuildError::MissingOutputDirectory)?;

    let template = non_blank(&config.filename_template).unwrap_or(DEFAULT_FILENAME_TEMPLATE);
    let file = if config.batch_mode {
        format!("{:03}-%(id)s_{}", job.index, template)
    } else {
        template.to_string()
    };

    Ok(dir.join(file).to_string_lossy().into_owned())
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFormat, AudioQuality, VideoContainer, VideoQuality};
    use std::path::PathBuf;

    fn tools() -> ToolPaths {
        ToolPaths {
            downloader: PathBuf::from("/opt/tools/yt-dlp"),
            post_processor_dir: PathBuf::from("/opt/tools"),
        }
    }

    fn config() -> DownloadConfiguration {
        DownloadConfiguration {
            output_directory: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        }
    }

    fn job(index: usize) -> DownloadJob {
        DownloadJob {
            url: format!("https://example.com/watch?v={index}"),
            index,
            total: 2,
        }
    }

    fn count(args: &[String], flag: &str) -> usize {
        args.iter().filter(|a| a.as_str() == flag).count()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn always_includes_base_flags_and_url_last() {
        let args = build(&config(), &job(1), &tools()).unwrap();
        assert_eq!(args.last().unwrap(), "https://example.com/watch?v=1");
        assert_eq!(count(&args, "--newline"), 1);
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/opt/tools"));
        let out = PathBuf::from(value_after(&args, "-o").unwrap());
        assert_eq!(out, PathBuf::from("/tmp/out").join("%(title)s.%(ext)s"));
        assert_eq!(value_after(&args, "-f"), Some("bv*+ba/best"));
    }

    #[test]
    fn video_format_bounds_height_and_merges_container() {
        for quality in VideoQuality::ALL {
            for container in VideoContainer::ALL {
                let cfg = DownloadConfiguration {
                    format: DownloadFormat::Video,
                    video_quality: quality,
                    video_container: container,
                    ..config()
                };
                let args = build(&cfg, &job(1), &tools()).unwrap();
                let selector = format!("bestvideo[height<={}]+bestaudio", quality.height_px());
                assert_eq!(value_after(&args, "-f"), Some(selector.as_str()));
                assert_eq!(
                    value_after(&args, "--merge-output-format"),
                    Some(container.as_str())
                );
                assert_eq!(count(&args, "--extract-audio"), 0);
            }
        }
    }

    #[test]
    fn audio_format_extracts_and_never_merges() {
        for format in AudioFormat::ALL {
            for quality in AudioQuality::ALL {
                let cfg = DownloadConfiguration {
                    format: DownloadFormat::Audio,
                    audio_format: format,
                    audio_quality: quality,
                    ..config()
                };
                let args = build(&cfg, &job(1), &tools()).unwrap();
                assert_eq!(count(&args, "--extract-audio"), 1);
                assert_eq!(value_after(&args, "--audio-format"), Some(format.as_str()));
                assert_eq!(value_after(&args, "--audio-quality"), Some(quality.as_str()));
                assert_eq!(count(&args, "--merge-output-format"), 0);
            }
        }
    }

    #[test]
    fn rate_flags_only_when_set() {
        let args = build(&config(), &job(1), &tools()).unwrap();
        assert_eq!(count(&args, "--limit-rate"), 0);
        assert_eq!(count(&args, "--throttled-rate"), 0);

        let cfg = DownloadConfiguration {
            speed_limit: "1M".into(),
            throttle_rate: " 100K ".into(),
            ..config()
        };
        let args = build(&cfg, &job(1), &tools()).unwrap();
        assert_eq!(count(&args, "--limit-rate"), 1);
        assert_eq!(value_after(&args, "--limit-rate"), Some("1M"));
        assert_eq!(count(&args, "--throttled-rate"), 1);
        assert_eq!(value_after(&args, "--throttled-rate"), Some("100K"));

        let cfg = DownloadConfiguration {
            speed_limit: "   ".into(),
            ..config()
        };
        let args = build(&cfg, &job(1), &tools()).unwrap();
        assert_eq!(count(&args, "--limit-rate"), 0);
    }

    #[test]
    fn optional_toggles() {
        let cfg = DownloadConfiguration {
            embed_subtitles: true,
            subtitle_languages: String::new(),
            embed_metadata: true,
            skip_existing: true,
            ..config()
        };
        let args = build(&cfg, &job(1), &tools()).unwrap();
        assert_eq!(value_after(&args, "--sub-langs"), Some("all"));
        assert_eq!(count(&args, "--embed-subs"), 1);
        assert_eq!(count(&args, "--embed-metadata"), 1);
        assert_eq!(count(&args, "--embed-thumbnail"), 1);
        assert_eq!(count(&args, "--no-overwrites"), 1);

        let cfg = DownloadConfiguration {
            embed_subtitles: true,
            subtitle_languages: "en,es".into(),
            ..config()
        };
        let args = build(&cfg, &job(1), &tools()).unwrap();
        assert_eq!(value_after(&args, "--sub-langs"), Some("en,es"));
        assert_eq!(count(&args, "--embed-metadata"), 0);
    }

    #[test]
    fn batch_templates_are_distinct_per_item() {
        let cfg = DownloadConfiguration {
            batch_mode: true,
            ..config()
        };
        let first = output_template(&cfg, &job(1)).unwrap();
        let second = output_template(&cfg, &job(2)).unwrap();
        assert_ne!(first, second);
        assert!(first.contains("%(id)s_%(title)s.%(ext)s"));
    }

    #[test]
    fn empty_template_falls_back_to_default() {
        let cfg = DownloadConfiguration {
            filename_template: "  ".into(),
            ..config()
        };
        let out = output_template(&cfg, &job(1)).unwrap();
        assert!(out.ends_with(DEFAULT_FILENAME_TEMPLATE));
    }

    #[test]
    fn missing_paths_are_build_errors() {
        let no_tool = ToolPaths {
            downloader: PathBuf::new(),
            ..tools()
        };
        assert_eq!(
            build(&config(), &job(1), &no_tool),
            Err(BuildError::MissingToolPath(Tool::Downloader))
        );

        let no_dir = DownloadConfiguration {
            output_directory: None,
            ..config()
        };
        assert_eq!(
            build(&no_dir, &job(1), &tools()),
            Err(BuildError::MissingOutputDirectory)
        );
    }
}
