use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{AppError, PipelineStage, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::media::{
    transcriber, AudioExtractor, FfmpegExtractor, MediaFetcher, SpeechRecognizer, YtDlpFetcher,
};
use crate::subtitle_processor::render_cues;
use crate::translation::{translate_file, RewriteOptions, TranslationService, Translator};

// @module: Application controller driving the subtitle pipeline

// @struct: Per-run switches
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    // @field: Produce a translated sibling file
    pub translate: bool,

    // @field: Use subtitles the platform publishes instead of recognizing speech
    pub prefer_platform_subtitles: bool,
}

// @struct: Artifacts produced by one pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    // @field: Downloaded media, absent when platform subtitles were used
    pub media: Option<PathBuf>,

    // @field: Extracted audio, absent when platform subtitles were used
    pub audio: Option<PathBuf>,

    // @field: Caption file in the source language
    pub subtitles: PathBuf,

    // @field: Translated sibling caption file
    pub translated: Option<PathBuf>,

    // @field: Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Main application controller for subtitle generation and translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Remote media downloader
    fetcher: Box<dyn MediaFetcher>,

    // @field: Audio track extractor
    extractor: Box<dyn AudioExtractor>,

    // @field: Speech recognizer
    recognizer: Box<dyn SpeechRecognizer>,

    // @field: Line translator
    translator: Arc<dyn Translator>,

    // @field: Concurrency and deadlines for rewrites
    rewrite_options: RewriteOptions,

    // @field: Draw a progress bar while translating
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller wired to the configured tools and backend
    pub fn from_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(&config.translation, &backend_language(&config.source_language))
            .context("Failed to create translation service")?;
        let rewrite_options = RewriteOptions {
            max_concurrent_requests: service.max_concurrent_requests(),
            request_timeout: Some(Duration::from_secs(config.translation.get_timeout_secs())),
        };

        Ok(Self {
            fetcher: Box::new(YtDlpFetcher::from_config(&config.media)),
            extractor: Box::new(FfmpegExtractor::from_config(&config.media)),
            recognizer: transcriber::from_config(&config.transcription, &config.media),
            translator: Arc::new(service),
            rewrite_options,
            show_progress: true,
            config,
        })
    }

    // @method: Create a controller from explicit collaborators
    pub fn with_components(
        config: Config,
        fetcher: Box<dyn MediaFetcher>,
        extractor: Box<dyn AudioExtractor>,
        recognizer: Box<dyn SpeechRecognizer>,
        translator: Arc<dyn Translator>,
        rewrite_options: RewriteOptions,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            recognizer,
            translator,
            rewrite_options,
            show_progress: false,
        }
    }

    /// Enable or disable the translation progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline for one remote source
    ///
    /// Every stage runs to completion before the next starts. A failure
    /// stops the run and is reported with the stage it came from.
    pub async fn run(&mut self, source: &str, options: &RunOptions) -> Result<RunReport, AppError> {
        let start_time = Instant::now();
        if options.translate {
            self.check_translator().await?;
        }
        let work_dir = self.config.media.work_dir.clone();
        FileManager::ensure_dir(&work_dir).map_err(|e| AppError::at_stage(PipelineStage::Write, e))?;

        let source_language = backend_language(&self.config.source_language);
        let platform_subtitles = if options.prefer_platform_subtitles {
            self.fetcher
                .fetch_subtitles(source, &source_language, &work_dir)
                .await
                .map_err(|e| AppError::at_stage(PipelineStage::Fetch, e))?
        } else {
            None
        };

        let (media, audio, subtitles) = match platform_subtitles {
            Some(path) => (None, None, path),
            None => {
                if options.prefer_platform_subtitles {
                    info!("Falling back to speech recognition");
                }
                let media = self
                    .fetcher
                    .fetch(source, &work_dir)
                    .await
                    .map_err(|e| AppError::at_stage(PipelineStage::Fetch, e))?;
                let audio = self
                    .extractor
                    .extract(&media, &work_dir)
                    .await
                    .map_err(|e| AppError::at_stage(PipelineStage::Extract, e))?;
                let subtitles = self.transcribe_to_srt(&audio, &work_dir).await?;
                (Some(media), Some(audio), subtitles)
            }
        };

        let translated = if options.translate {
            Some(self.translate_srt(&subtitles).await?)
        } else {
            None
        };

        let elapsed = start_time.elapsed();
        info!("Success: {} ({})", subtitles.display(), format_duration(elapsed));
        Ok(RunReport {
            media,
            audio,
            subtitles,
            translated,
            elapsed,
        })
    }

    /// Recognize speech in `audio` and write a caption file into `target_dir`
    ///
    /// The recognizer is disposed even when transcription fails.
    pub async fn transcribe_to_srt(&mut self, audio: &Path, target_dir: &Path) -> Result<PathBuf, AppError> {
        let language = backend_language(&self.config.source_language);

        self.recognizer
            .initialize()
            .await
            .map_err(|e| AppError::at_stage(PipelineStage::Transcribe, e))?;
        let transcript = self.recognizer.transcribe(audio, &language).await;
        if let Err(e) = self.recognizer.dispose().await {
            warn!("Failed to release speech recognizer: {}", e);
        }
        let transcript = transcript.map_err(|e| AppError::at_stage(PipelineStage::Transcribe, e))?;

        let cues = transcript
            .into_cues(self.config.transcription.max_chars_per_line)
            .map_err(|e| AppError::at_stage(PipelineStage::Segment, e))?;
        if cues.is_empty() {
            warn!("No speech recognized in {:?}", audio);
        }
        debug!("Rendering {} cues", cues.len());

        let rendered = render_cues(&cues).map_err(|e| AppError::at_stage(PipelineStage::Render, e))?;
        let output = FileManager::unique_path(target_dir, Some(&language), "srt");
        FileManager::write_to_file(&output, &rendered).map_err(|e| AppError::at_stage(PipelineStage::Write, e))?;

        info!("Subtitles written to {:?}", output);
        Ok(output)
    }

    /// Fail early when the translation backend cannot be reached
    pub async fn check_translator(&self) -> Result<(), AppError> {
        self.translator
            .test_connection()
            .await
            .map_err(|e| AppError::at_stage(PipelineStage::Translate, TranslationError::Unreachable(e)))
    }

    /// Translate an existing caption file into the configured target language
    pub async fn translate_srt(&self, path: &Path) -> Result<PathBuf, AppError> {
        let target_language = backend_language(&self.config.target_language);
        let progress_bar = self.progress_bar();
        let pb = progress_bar.clone();

        info!(
            "Translating {} -> {} with {}",
            self.config.source_language,
            self.config.target_language,
            self.config.translation.provider.display_name()
        );

        let result = translate_file(
            path,
            self.translator.as_ref(),
            &target_language,
            &self.rewrite_options,
            &move |done: usize, total: usize| {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            },
        )
        .await;

        progress_bar.finish_and_clear();
        result.map_err(|e| AppError::at_stage(PipelineStage::Translate, e))
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }
}

/// Language code in the form backends expect (2 letters where one exists)
fn backend_language(code: &str) -> String {
    language_utils::normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_string())
}

// Format duration in a human-readable format
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
