/*!
 * External media collaborators.
 *
 * Fetching, audio extraction and speech recognition are reached through
 * narrow traits so the pipeline never depends on a concrete tool:
 *
 * - `fetcher`: `MediaFetcher` backed by yt-dlp
 * - `extractor`: `AudioExtractor` backed by ffmpeg
 * - `transcriber`: `SpeechRecognizer` backed by a whisper CLI or any
 *   command printing plain text
 */

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::{ExternalServiceError, PipelineStage, SubtitleError};
use crate::segmenter::FlatTranscript;
use crate::subtitle_processor::{cues_from_segments, Cue, TimedSegment};

pub use self::extractor::FfmpegExtractor;
pub use self::fetcher::YtDlpFetcher;
pub use self::transcriber::{FlatCommandEngine, WhisperCliEngine};

/// Downloads remote media into a local directory
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `source` into `target_dir`, returning the local media path
    async fn fetch(&self, source: &str, target_dir: &Path) -> Result<PathBuf, ExternalServiceError>;

    /// Fetch subtitles the platform already publishes for `language`
    ///
    /// `Ok(None)` means none are available.
    async fn fetch_subtitles(
        &self,
        _source: &str,
        _language: &str,
        _target_dir: &Path,
    ) -> Result<Option<PathBuf>, ExternalServiceError> {
        Ok(None)
    }
}

/// Pulls the audio track out of a media file
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract audio from `media` into `target_dir`, returning the audio path
    async fn extract(&self, media: &Path, target_dir: &Path) -> Result<PathBuf, ExternalServiceError>;
}

/// Speech recognizer with an explicit lifecycle
///
/// Callers `initialize` before the first `transcribe` and `dispose` once
/// done, including after a failed transcription.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Load whatever the recognizer needs
    async fn initialize(&mut self) -> Result<(), ExternalServiceError> {
        Ok(())
    }

    /// Transcribe an audio file spoken in `language`
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript, ExternalServiceError>;

    /// Release whatever `initialize` acquired
    async fn dispose(&mut self) -> Result<(), ExternalServiceError> {
        Ok(())
    }
}

/// Recognizer output, either time-aligned or flat
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    /// Segments carrying their own start and end offsets
    Timed(Vec<TimedSegment>),
    /// Words plus total duration, to be paced by the segmenter
    Flat(FlatTranscript),
}

impl Transcript {
    /// Turn the transcript into numbered cues
    pub fn into_cues(self, max_chars_per_line: usize) -> Result<Vec<Cue>, SubtitleError> {
        match self {
            Transcript::Timed(segments) => cues_from_segments(&segments),
            Transcript::Flat(flat) => flat.to_cues(max_chars_per_line),
        }
    }
}

/// Number of stderr lines kept in a failure message
const STDERR_TAIL_LINES: usize = 20;

/// Run an external program to completion and return its stdout
///
/// The child is killed if `timeout` expires first.
pub(crate) async fn run_command(
    stage: PipelineStage,
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, ExternalServiceError> {
    debug!("Running {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExternalServiceError::Spawn {
            stage,
            program: program.to_string(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ExternalServiceError::Timeout {
            stage,
            secs: timeout.as_secs(),
        })?
        .map_err(|source| ExternalServiceError::Spawn {
            stage,
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        return Err(ExternalServiceError::failed(
            stage,
            format!("{} exited with {}: {}", program, output.status, tail.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Render a path as a command-line argument
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub mod extractor;
pub mod fetcher;
pub mod transcriber;
