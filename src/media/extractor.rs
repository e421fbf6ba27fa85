use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::{AudioFormat, MediaConfig};
use crate::errors::{ExternalServiceError, PipelineStage};
use crate::file_utils::FileManager;
use super::{path_arg, run_command, AudioExtractor};

// @module: Audio track extraction through ffmpeg

// @struct: ffmpeg backed extractor
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    // @field: ffmpeg executable
    program: String,

    // @field: Output audio format
    format: AudioFormat,

    // @field: Deadline for one ffmpeg run
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(program: impl Into<String>, format: AudioFormat, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            format,
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.audio_format,
            Duration::from_secs(config.timeout_secs),
        )
    }

    // @returns: ffmpeg arguments converting `media` into `output`
    fn args(&self, media: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            path_arg(media),
            "-vn".to_string(),
        ];

        match self.format {
            AudioFormat::Mp3 => args.extend(["-q:a", "0", "-map", "a"].map(String::from)),
            // 16kHz mono PCM, the rate speech models expect
            AudioFormat::Wav => args.extend(
                ["-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"].map(String::from),
            ),
        }

        args.push(path_arg(output));
        args
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, media: &Path, target_dir: &Path) -> Result<PathBuf, ExternalServiceError> {
        let stage = PipelineStage::Extract;
        if !FileManager::file_exists(media) {
            return Err(ExternalServiceError::failed(
                stage,
                format!("media file {:?} does not exist", media),
            ));
        }
        FileManager::ensure_dir(target_dir).map_err(|e| {
            ExternalServiceError::failed(stage, format!("cannot create {:?}: {}", target_dir, e))
        })?;

        let output = FileManager::unique_path(target_dir, None, self.format.extension());
        run_command(stage, &self.program, &self.args(media, &output), self.timeout).await?;

        if !FileManager::file_exists(&output) {
            return Err(ExternalServiceError::failed(
                stage,
                format!("ffmpeg did not produce {:?}", output),
            ));
        }

        info!("Extracted audio to {:?}", output);
        Ok(output)
    }
}
