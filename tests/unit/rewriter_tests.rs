/*!
 * Tests for the line-preserving caption rewrite
 */

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ytaisub::errors::{AppError, ProviderError, TranslationError};
use ytaisub::providers::mock::MockProvider;
use ytaisub::subtitle_processor::{classify_lines, ClassifiedCaption, LineKind};
use ytaisub::translation::{rewrite_caption, rewrite_caption_with_progress, translate_file, RewriteOptions, Translator};
use crate::common;

/// Translator that records how many calls overlap
struct OverlapTracker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl OverlapTracker {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for OverlapTracker {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

/// Translator that never answers in time
struct Stalled;

#[async_trait]
impl Translator for Stalled {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, ProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(text.to_string())
    }
}

fn options(max_concurrent_requests: usize) -> RewriteOptions {
    RewriteOptions {
        max_concurrent_requests,
        request_timeout: Some(Duration::from_secs(5)),
    }
}

#[tokio::test]
async fn test_rewrite_caption_withSample_shouldKeepStructureLineForLine() {
    let caption = ClassifiedCaption::parse(common::SAMPLE_SRT);
    let output = rewrite_caption(&caption, &MockProvider::working(), "es", &options(4))
        .await
        .unwrap();

    let input_lines = classify_lines(common::SAMPLE_SRT);
    let output_lines: Vec<&str> = output.lines().collect();
    assert_eq!(output_lines.len(), input_lines.len());

    for (input, output) in input_lines.iter().zip(&output_lines) {
        match input.kind {
            LineKind::Text => assert_eq!(*output, format!("[es] {}", input.content)),
            LineKind::Blank => assert_eq!(*output, ""),
            LineKind::Index | LineKind::Timing => assert_eq!(*output, input.content),
        }
    }
    assert!(output.ends_with("For testing purposes.\n\n"));
}

#[tokio::test]
async fn test_rewrite_caption_withoutTrailingNewline_shouldNotAddOne() {
    let caption = ClassifiedCaption::parse("1\n00:00:00,000 --> 00:00:01,000\nHi");
    let output = rewrite_caption(&caption, &MockProvider::working(), "fr", &options(1))
        .await
        .unwrap();
    assert_eq!(output, "1\n00:00:00,000 --> 00:00:01,000\n[fr] Hi");
}

#[tokio::test]
async fn test_rewrite_caption_withPaddedLines_shouldTrimBeforeTranslating() {
    let caption = ClassifiedCaption::parse(" 1 \n00:00:00,000 --> 00:00:01,000  \n   Hi there  \n \t\n");
    let output = rewrite_caption(&caption, &MockProvider::working(), "fr", &options(1))
        .await
        .unwrap();
    assert_eq!(output, "1\n00:00:00,000 --> 00:00:01,000\n[fr] Hi there\n\n");
}

#[tokio::test]
async fn test_rewrite_caption_withNoTextLines_shouldNotCallTranslator() {
    let provider = MockProvider::working();
    let caption = ClassifiedCaption::parse("1\n00:00:00,000 --> 00:00:01,000\n\n");
    let output = rewrite_caption(&caption, &provider, "fr", &options(2)).await.unwrap();
    assert_eq!(output, "1\n00:00:00,000 --> 00:00:01,000\n\n");
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_rewrite_caption_shouldRespectConcurrencyLimit() {
    let text: String = (1..=12)
        .map(|i| format!("{}\n00:00:{:02},000 --> 00:00:{:02},500\nline {}\n\n", i, i, i, i))
        .collect();
    let caption = ClassifiedCaption::parse(&text);
    let tracker = OverlapTracker::new();

    let output = rewrite_caption(&caption, &tracker, "fr", &options(3)).await.unwrap();

    let peak = tracker.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {}", peak);
    assert!(output.contains("\nLINE 7\n"));
}

#[tokio::test]
async fn test_rewrite_caption_withStalledTranslator_shouldTimeOut() {
    let caption = ClassifiedCaption::parse(common::SAMPLE_SRT);
    let options = RewriteOptions {
        max_concurrent_requests: 2,
        request_timeout: Some(Duration::from_millis(20)),
    };

    let err = rewrite_caption(&caption, &Stalled, "fr", &options).await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        TranslationError::Line { source, .. } => assert!(matches!(source, ProviderError::Timeout(_))),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rewrite_caption_withFailingProvider_shouldNotBeRetryable() {
    let caption = ClassifiedCaption::parse(common::SAMPLE_SRT);
    let err = rewrite_caption(&caption, &MockProvider::failing(), "fr", &options(1))
        .await
        .unwrap_err();
    // Only one call in flight, so the first text line is the one reported
    assert_eq!(err.line_number(), Some(3));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rewrite_caption_withProgress_shouldReachTotal() {
    let caption = ClassifiedCaption::parse(common::SAMPLE_SRT);
    let seen = Mutex::new(Vec::new());

    rewrite_caption_with_progress(
        &caption,
        &MockProvider::working(),
        "fr",
        &options(2),
        &|done: usize, total: usize| {
            if let Ok(mut seen) = seen.lock() {
                seen.push((done, total));
            }
        },
    )
    .await
    .unwrap();

    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
}

#[tokio::test]
async fn test_translate_file_shouldWriteSiblingAndKeepSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "talk.en.srt")?;

    let output = translate_file(&source, &MockProvider::working(), "fr", &options(4), &|_: usize, _: usize| {}).await?;

    assert_ne!(output, source);
    assert_eq!(output.parent(), source.parent());
    assert_eq!(std::fs::read_to_string(&source)?, common::SAMPLE_SRT);

    let translated = std::fs::read_to_string(&output)?;
    assert!(translated.contains("[fr] It contains multiple entries.\n[fr] And a second line.\n"));
    assert_eq!(common::list_files(temp_dir.path()).len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withFailingLine_shouldWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "talk.en.srt")?;

    let result = translate_file(
        &source,
        &MockProvider::failing_on("second line"),
        "fr",
        &options(4),
        &|_: usize, _: usize| {},
    )
    .await;

    match result {
        Err(AppError::Translation(TranslationError::Line { line_number, .. })) => assert_eq!(line_number, 8),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(common::list_files(temp_dir.path()), vec![source]);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMissingSource_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let missing = temp_dir.path().join("nope.srt");
    let result = translate_file(&missing, &MockProvider::working(), "fr", &options(1), &|_: usize, _: usize| {}).await;
    assert!(result.is_err());
}

/// Translator that answers later lines first
struct ReverseOrder;

#[async_trait]
impl Translator for ReverseOrder {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, ProviderError> {
        let n: u64 = text.trim_start_matches("line ").parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(n * 10))).await;
        Ok(format!("done {}", n))
    }
}

#[tokio::test]
async fn test_rewrite_caption_withReversedCompletion_shouldPlaceEachLineInItsSlot() {
    let text: String = (1..=5)
        .map(|i| format!("{}\n00:00:0{},000 --> 00:00:0{},500\nline {}\n\n", i, i, i, i))
        .collect();
    let output = rewrite_caption(&ClassifiedCaption::parse(&text), &ReverseOrder, "fr", &options(5))
        .await
        .unwrap();

    let expected: String = (1..=5)
        .map(|i| format!("{}\n00:00:0{},000 --> 00:00:0{},500\ndone {}\n\n", i, i, i, i))
        .collect();
    assert_eq!(output, expected);
}

#[tokio::test]
async fn test_rewrite_caption_withFirstLineFailing_shouldStopIssuingRequests() {
    let mut text = String::from("1\n00:00:00,000 --> 00:00:00,500\nfirst\n\n");
    for i in 2..=50 {
        text.push_str(&format!("{}\n00:00:{:02},000 --> 00:00:{:02},500\nline {}\n\n", i, i, i, i));
    }
    let provider = MockProvider::failing_on("first");

    let err = rewrite_caption(&ClassifiedCaption::parse(&text), &provider, "fr", &options(1))
        .await
        .unwrap_err();

    assert_eq!(err.line_number(), Some(3));
    assert_eq!(provider.request_count(), 1);
}
