/*!
 * Common test utilities for the ytaisub test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use ytaisub::app_config::Config;
use ytaisub::errors::{ExternalServiceError, PipelineStage};
use ytaisub::media::{AudioExtractor, MediaFetcher, SpeechRecognizer, Transcript};

/// Sample caption file with a two-line cue and a trailing separator
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.
And a second line.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.

";

/// Route library logs to the test harness; repeated calls are harmless
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// Files in `dir`, sorted
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// Default config pointed at `work_dir`
pub fn test_config(work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.media.work_dir = work_dir.to_path_buf();
    config
}

/// Fetcher that writes a placeholder media file, or fails on demand
pub struct FakeFetcher {
    pub fail: bool,
    pub published_subtitles: Option<&'static str>,
    pub fetch_calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn working() -> Self {
        Self {
            fail: false,
            published_subtitles: None,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn with_published_subtitles(content: &'static str) -> Self {
        Self {
            published_subtitles: Some(content),
            ..Self::working()
        }
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, source: &str, target_dir: &Path) -> Result<PathBuf, ExternalServiceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExternalServiceError::failed(
                PipelineStage::Fetch,
                format!("video unavailable: {}", source),
            ));
        }
        let path = target_dir.join("media.mp4");
        fs::write(&path, b"not really a video")
            .map_err(|e| ExternalServiceError::failed(PipelineStage::Fetch, e.to_string()))?;
        Ok(path)
    }

    async fn fetch_subtitles(
        &self,
        _source: &str,
        language: &str,
        target_dir: &Path,
    ) -> Result<Option<PathBuf>, ExternalServiceError> {
        match self.published_subtitles {
            Some(content) => {
                let path = target_dir.join(format!("published.{}.srt", language));
                fs::write(&path, content)
                    .map_err(|e| ExternalServiceError::failed(PipelineStage::Fetch, e.to_string()))?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }
}

/// Extractor that writes a placeholder audio file next to the media
pub struct FakeExtractor;

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, _media: &Path, target_dir: &Path) -> Result<PathBuf, ExternalServiceError> {
        let path = target_dir.join("audio.mp3");
        fs::write(&path, b"not really audio")
            .map_err(|e| ExternalServiceError::failed(PipelineStage::Extract, e.to_string()))?;
        Ok(path)
    }
}

/// Recognizer returning a canned transcript and counting lifecycle calls
pub struct FakeRecognizer {
    pub transcript: Option<Transcript>,
    pub initialized: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
}

impl FakeRecognizer {
    pub fn returning(transcript: Transcript) -> Self {
        Self {
            transcript: Some(transcript),
            initialized: Arc::new(AtomicUsize::new(0)),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            initialized: Arc::new(AtomicUsize::new(0)),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn initialize(&mut self) -> Result<(), ExternalServiceError> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<Transcript, ExternalServiceError> {
        self.transcript.clone().ok_or_else(|| {
            ExternalServiceError::failed(PipelineStage::Transcribe, "model crashed")
        })
    }

    async fn dispose(&mut self) -> Result<(), ExternalServiceError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
