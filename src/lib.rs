/*!
 * # ytaisub - timed, translated subtitles for online videos
 *
 * A Rust library that turns spoken content into caption files and
 * translates them while keeping every structural line intact.
 *
 * ## Features
 *
 * - Download media with yt-dlp and extract its audio with ffmpeg
 * - Recognize speech with a whisper CLI or any plain-text command
 * - Pace untimed transcripts into evenly timed cues
 * - Render and parse SRT caption files
 * - Translate caption text line by line with bounded concurrency:
 *   - Google web translation endpoint
 *   - Ollama (local LLM)
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Timestamps, cues, rendering and line classification
 * - `segmenter`: Fixed-rate segmentation of flat transcripts
 * - `translation`: Caption rewriting:
 *   - `translation::rewriter`: Line-preserving rewrite and file translation
 *   - `translation::core`: Translation service over the configured backend
 *   - `translation::cache`: Caching of repeated lines
 * - `media`: Fetcher, extractor and speech recognizer collaborators
 * - `providers`: Clients for translation backends
 * - `file_utils`: File system operations
 * - `app_controller`: Pipeline orchestration
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod providers;
pub mod segmenter;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOptions, RunReport};
pub use errors::{AppError, ExternalServiceError, PipelineStage, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use segmenter::{segment_words, FlatTranscript};
pub use subtitle_processor::{
    classify_line, format_timestamp, render_cues, ClassifiedCaption, Cue, LineKind, TimedSegment,
};
pub use translation::{RewriteOptions, TranslationService, Translator};
