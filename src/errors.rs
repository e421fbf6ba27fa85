/*!
 * Error types for the ytaisub application.
 *
 * This module contains custom error types for the different parts of the
 * subtitle pipeline, using the thiserror crate for ergonomic error definitions:
 *
 * - `SubtitleError`: malformed arguments to the formatter, segmenter or parser
 * - `ProviderError`: failures raised by a translation backend
 * - `TranslationError`: a failed rewrite, naming the offending line
 * - `ExternalServiceError`: fetcher, extractor or speech recognizer failures
 * - `AppError`: pipeline-level wrapper used by the controller
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stages of a pipeline run, used to tag errors with their origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetch,
    Extract,
    Transcribe,
    Segment,
    Render,
    Translate,
    Write,
}

impl PipelineStage {
    // @returns: Human readable stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetch => "media fetch",
            Self::Extract => "audio extraction",
            Self::Transcribe => "transcription",
            Self::Segment => "segmentation",
            Self::Render => "rendering",
            Self::Translate => "translation",
            Self::Write => "file write",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Malformed input to the subtitle core (formatter, segmenter, parser)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// Timestamp below zero or not a finite number
    #[error("Invalid input: timestamp must be a non-negative number of seconds, got {0}")]
    InvalidTimestamp(f64),

    /// Transcript duration of zero or less
    #[error("Invalid input: duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    /// Character budget of zero
    #[error("Invalid input: max_chars_per_line must be positive")]
    ZeroLineBudget,

    /// Timing line that does not match `HH:MM:SS,mmm --> HH:MM:SS,mmm`
    #[error("Invalid input: malformed timing line '{0}'")]
    MalformedTiming(String),

    /// Cue block that is structurally broken
    #[error("Invalid input: malformed cue at line {line_number}: {reason}")]
    MalformedCue {
        /// 1-based line number in the caption file
        line_number: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Required input that was empty
    #[error("Invalid input: {0} must not be empty")]
    EmptyInput(&'static str),
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not complete in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

/// Errors that can occur while rewriting a caption file into another language
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The backend failed on one physical line
    #[error("Translation failed at line {line_number} ('{content}'): {source}")]
    Line {
        /// 1-based line number in the caption file
        line_number: usize,
        /// Trimmed content of the line that was sent
        content: String,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// The backend did not answer the connection check
    #[error("Translation backend is not reachable: {0}")]
    Unreachable(#[source] ProviderError),

    /// The translated file could not be written
    #[error("Failed to persist translated subtitles to {path:?}: {source}")]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

impl TranslationError {
    // @returns: Failing line number, if the error is tied to a line
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::Line { line_number, .. } => Some(*line_number),
            Self::Unreachable(_) | Self::Persist { .. } => None,
        }
    }

    /// A line that timed out may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Line {
                source: ProviderError::Timeout(_) | ProviderError::RateLimitExceeded(_),
                ..
            }
        )
    }
}

/// Failures surfaced by the fetcher, extractor or speech recognizer
///
/// The cause is never interpreted; it is forwarded together with the stage.
#[derive(Error, Debug)]
pub enum ExternalServiceError {
    /// The collaborator ran but reported a failure
    #[error("{stage} failed: {message}")]
    Failed {
        /// Stage that failed
        stage: PipelineStage,
        /// Collaborator output describing the failure
        message: String,
    },

    /// The collaborator could not be started at all
    #[error("{stage} could not start '{program}': {source}")]
    Spawn {
        /// Stage that failed
        stage: PipelineStage,
        /// Program that was invoked
        program: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The collaborator did not finish in time
    #[error("{stage} timed out after {secs}s")]
    Timeout {
        /// Stage that failed
        stage: PipelineStage,
        /// Timeout that expired
        secs: u64,
    },
}

impl ExternalServiceError {
    /// Shorthand for a `Failed` error
    pub fn failed(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }

    // @returns: Stage the error originated from
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Failed { stage, .. } | Self::Spawn { stage, .. } | Self::Timeout { stage, .. } => {
                *stage
            }
        }
    }

    /// Timeouts may succeed on a later attempt; everything else is terminal
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from an external collaborator, already tagged with its stage
    #[error("External service error: {0}")]
    External(#[from] ExternalServiceError),

    /// Error tagged with the pipeline stage it happened in
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that failed
        stage: PipelineStage,
        /// Underlying failure
        #[source]
        source: Box<AppError>,
    },

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Tag an error with the stage it happened in
    ///
    /// External service errors already carry their stage and pass through.
    pub fn at_stage(stage: PipelineStage, error: impl Into<AppError>) -> Self {
        match error.into() {
            external @ AppError::External(_) => external,
            tagged @ AppError::Stage { .. } => tagged,
            other => AppError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    // @returns: Stage the error is attributed to, if known
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::External(e) => Some(e.stage()),
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
