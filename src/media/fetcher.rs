use async_trait::async_trait;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::MediaConfig;
use crate::errors::{ExternalServiceError, PipelineStage};
use crate::file_utils::FileManager;
use super::{path_arg, run_command, MediaFetcher};

// @module: Media download through yt-dlp

// @struct: yt-dlp backed fetcher
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    // @field: yt-dlp executable
    program: String,

    // @field: Container the streams are merged into
    merge_format: String,

    // @field: Upper bound on video height
    max_height: u32,

    // @field: Deadline for one yt-dlp run
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>, merge_format: impl Into<String>, max_height: u32, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            merge_format: merge_format.into(),
            max_height,
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            config.yt_dlp_path.clone(),
            config.video_format.clone(),
            config.max_height,
            Duration::from_secs(config.timeout_secs),
        )
    }

    // @returns: yt-dlp format selector capped at `max_height`
    pub fn format_selector(&self) -> String {
        format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
            h = self.max_height
        )
    }

    // @returns: Arguments for a full media download
    fn download_args(&self, source: &str, output_template: &str) -> Vec<String> {
        vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            self.format_selector(),
            "--merge-output-format".to_string(),
            self.merge_format.clone(),
            "-o".to_string(),
            output_template.to_string(),
            source.to_string(),
        ]
    }

    // @returns: Arguments for a subtitle-only download
    fn subtitle_args(&self, source: &str, language: &str, output_template: &str) -> Vec<String> {
        vec![
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--sub-langs".to_string(),
            language.to_string(),
            "--convert-subs".to_string(),
            "srt".to_string(),
            "-o".to_string(),
            output_template.to_string(),
            source.to_string(),
        ]
    }
}

/// Prepare `target_dir` and return a fresh token plus the yt-dlp output template
fn prepare_output(stage: PipelineStage, target_dir: &Path) -> Result<(String, String), ExternalServiceError> {
    FileManager::ensure_dir(target_dir).map_err(|e| {
        ExternalServiceError::failed(stage, format!("cannot create {:?}: {}", target_dir, e))
    })?;
    let token = FileManager::unique_token();
    let template = path_arg(&target_dir.join(format!("{}.%(ext)s", token)));
    Ok((token, template))
}

/// Pick the finished download among files named after `token`
fn pick_download(candidates: Vec<PathBuf>, preferred_extension: &str) -> Option<PathBuf> {
    let finished: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| {
            !matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("part") | Some("ytdl") | Some("temp")
            )
        })
        .collect();

    finished
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some(preferred_extension))
        .or_else(|| finished.first())
        .cloned()
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, source: &str, target_dir: &Path) -> Result<PathBuf, ExternalServiceError> {
        let stage = PipelineStage::Fetch;
        let (token, template) = prepare_output(stage, target_dir)?;

        info!("Downloading {} (max {}p)", source, self.max_height);
        run_command(stage, &self.program, &self.download_args(source, &template), self.timeout).await?;

        let candidates = FileManager::find_by_stem(target_dir, &token)
            .map_err(|e| ExternalServiceError::failed(stage, e.to_string()))?;
        let media = pick_download(candidates, &self.merge_format).ok_or_else(|| {
            ExternalServiceError::failed(stage, format!("yt-dlp produced no file for {}", source))
        })?;

        info!("Downloaded media to {:?}", media);
        Ok(media)
    }

    async fn fetch_subtitles(
        &self,
        source: &str,
        language: &str,
        target_dir: &Path,
    ) -> Result<Option<PathBuf>, ExternalServiceError> {
        let stage = PipelineStage::Fetch;
        let (token, template) = prepare_output(stage, target_dir)?;

        run_command(stage, &self.program, &self.subtitle_args(source, language, &template), self.timeout).await?;

        let expected = target_dir.join(format!("{}.{}.srt", token, language));
        if FileManager::file_exists(&expected) {
            info!("Using published {} subtitles {:?}", language, expected);
            Ok(Some(expected))
        } else {
            warn!("No published {} subtitles for {}", language, source);
            Ok(None)
        }
    }
}
