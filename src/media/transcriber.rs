/*!
 * Speech recognition engines.
 *
 * Both engines shell out to an installed program:
 *
 * - `WhisperCliEngine` runs the whisper CLI with JSON output and yields
 *   time-aligned segments.
 * - `FlatCommandEngine` runs any command that prints the transcript as
 *   plain text on stdout; the audio duration is probed with ffprobe so the
 *   segmenter can pace the words.
 */

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::app_config::{MediaConfig, TranscriptionConfig, TranscriptionEngine};
use crate::errors::{ExternalServiceError, PipelineStage};
use crate::file_utils::FileManager;
use crate::segmenter::FlatTranscript;
use crate::subtitle_processor::TimedSegment;
use super::{path_arg, run_command, SpeechRecognizer, Transcript};

/// Placeholder replaced by the audio path in `FlatCommandEngine` arguments
pub const AUDIO_PLACEHOLDER: &str = "{audio}";

/// Deadline for the availability check run by `initialize`
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON document written by `whisper --output_format json`
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<TimedSegment>,
}

/// Parse the JSON document whisper writes next to its other outputs
pub fn parse_whisper_json(json: &str) -> Result<Vec<TimedSegment>, ExternalServiceError> {
    serde_json::from_str::<WhisperOutput>(json)
        .map(|output| output.segments)
        .map_err(|e| {
            ExternalServiceError::failed(
                PipelineStage::Transcribe,
                format!("unreadable whisper output: {}", e),
            )
        })
}

/// Build the configured recognizer
pub fn from_config(transcription: &TranscriptionConfig, media: &MediaConfig) -> Box<dyn SpeechRecognizer> {
    let timeout = Duration::from_secs(transcription.timeout_secs);
    match transcription.engine {
        TranscriptionEngine::Whisper => Box::new(
            WhisperCliEngine::new(transcription.command.clone(), transcription.model.clone(), timeout)
                .with_extra_args(transcription.args.clone()),
        ),
        TranscriptionEngine::Flat => Box::new(FlatCommandEngine::new(
            transcription.command.clone(),
            transcription.args.clone(),
            media.ffprobe_path.clone(),
            timeout,
        )),
    }
}

fn not_initialized(engine: &str) -> ExternalServiceError {
    ExternalServiceError::failed(
        PipelineStage::Transcribe,
        format!("{} used before initialize", engine),
    )
}

/// whisper CLI engine producing time-aligned segments
#[derive(Debug, Clone)]
pub struct WhisperCliEngine {
    command: String,
    model: String,
    extra_args: Vec<String>,
    timeout: Duration,
    ready: bool,
}

impl WhisperCliEngine {
    pub fn new(command: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            model: model.into(),
            extra_args: Vec::new(),
            timeout,
            ready: false,
        }
    }

    /// Append arguments passed verbatim to every run
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    fn args(&self, audio: &Path, language: &str, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            path_arg(audio),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            path_arg(output_dir),
        ];
        if !language.is_empty() {
            args.push("--language".to_string());
            args.push(language.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCliEngine {
    async fn initialize(&mut self) -> Result<(), ExternalServiceError> {
        run_command(
            PipelineStage::Transcribe,
            &self.command,
            &["--help".to_string()],
            PROBE_TIMEOUT,
        )
        .await?;
        info!("Speech recognizer ready: {} (model {})", self.command, self.model);
        self.ready = true;
        Ok(())
    }

    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript, ExternalServiceError> {
        let stage = PipelineStage::Transcribe;
        if !self.ready {
            return Err(not_initialized("whisper engine"));
        }

        let output_dir = tempfile::tempdir()
            .map_err(|e| ExternalServiceError::failed(stage, format!("cannot create scratch dir: {}", e)))?;

        run_command(stage, &self.command, &self.args(audio, language, output_dir.path()), self.timeout).await?;

        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let json_path = output_dir.path().join(format!("{}.json", stem));
        let json = FileManager::read_to_string(&json_path).map_err(|e| {
            ExternalServiceError::failed(stage, format!("missing whisper output {:?}: {}", json_path, e))
        })?;

        let segments = parse_whisper_json(&json)?;
        debug!("whisper returned {} segments", segments.len());
        Ok(Transcript::Timed(segments))
    }

    async fn dispose(&mut self) -> Result<(), ExternalServiceError> {
        self.ready = false;
        debug!("Speech recognizer released");
        Ok(())
    }
}

/// Engine for commands that print an untimed transcript
#[derive(Debug, Clone)]
pub struct FlatCommandEngine {
    command: String,
    args: Vec<String>,
    ffprobe: String,
    timeout: Duration,
    ready: bool,
}

impl FlatCommandEngine {
    /// `args` may contain `{audio}`; without it the audio path is appended
    pub fn new(command: impl Into<String>, args: Vec<String>, ffprobe: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            ffprobe: ffprobe.into(),
            timeout,
            ready: false,
        }
    }

    fn args_for(&self, audio: &Path) -> Vec<String> {
        let audio = path_arg(audio);
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(AUDIO_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(AUDIO_PLACEHOLDER, &audio)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(audio);
        }
        args
    }

    /// Duration of the audio file in seconds, as reported by ffprobe
    async fn probe_duration(&self, audio: &Path) -> Result<f64, ExternalServiceError> {
        let stage = PipelineStage::Transcribe;
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path_arg(audio),
        ];
        let stdout = run_command(stage, &self.ffprobe, &args, PROBE_TIMEOUT).await?;
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| ExternalServiceError::failed(stage, format!("bad duration '{}': {}", stdout.trim(), e)))
    }
}

#[async_trait]
impl SpeechRecognizer for FlatCommandEngine {
    async fn initialize(&mut self) -> Result<(), ExternalServiceError> {
        self.ready = true;
        Ok(())
    }

    async fn transcribe(&self, audio: &Path, _language: &str) -> Result<Transcript, ExternalServiceError> {
        if !self.ready {
            return Err(not_initialized("flat command engine"));
        }

        let text = run_command(PipelineStage::Transcribe, &self.command, &self.args_for(audio), self.timeout).await?;
        let duration = self.probe_duration(audio).await?;
        let transcript = FlatTranscript::from_text(&text, duration);
        debug!("{} words over {:.2}s", transcript.words.len(), duration);
        Ok(Transcript::Flat(transcript))
    }

    async fn dispose(&mut self) -> Result<(), ExternalServiceError> {
        self.ready = false;
        Ok(())
    }
}
