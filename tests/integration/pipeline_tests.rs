/*!
 * End-to-end pipeline tests with fake collaborators
 */

use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use ytaisub::app_controller::{Controller, RunOptions};
use ytaisub::errors::{AppError, PipelineStage};
use ytaisub::media::Transcript;
use ytaisub::providers::mock::MockProvider;
use ytaisub::segmenter::FlatTranscript;
use ytaisub::subtitle_processor::{parse_cues, TimedSegment};
use ytaisub::translation::RewriteOptions;
use crate::common::{self, FakeExtractor, FakeFetcher, FakeRecognizer};

fn timed_transcript() -> Transcript {
    Transcript::Timed(vec![
        TimedSegment { id: 0, start: 0.0, end: 1.5, text: " Hello there.".to_string() },
        TimedSegment { id: 1, start: 1.5, end: 3.0, text: " General Kenobi.".to_string() },
    ])
}

fn controller(
    work_dir: &std::path::Path,
    fetcher: FakeFetcher,
    recognizer: FakeRecognizer,
    translator: MockProvider,
) -> Controller {
    common::init_test_logging();
    Controller::with_components(
        common::test_config(work_dir),
        Box::new(fetcher),
        Box::new(FakeExtractor),
        Box::new(recognizer),
        Arc::new(translator),
        RewriteOptions::default(),
    )
}

#[tokio::test]
async fn test_run_withTimedTranscript_shouldWriteSourceAndTranslatedCaptions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let recognizer = FakeRecognizer::returning(timed_transcript());
    let disposed = Arc::clone(&recognizer.disposed);
    let mut controller = controller(temp_dir.path(), FakeFetcher::working(), recognizer, MockProvider::working());

    let options = RunOptions {
        translate: true,
        prefer_platform_subtitles: false,
    };
    let report = controller.run("https://example.com/watch?v=abc", &options).await?;

    assert!(report.media.as_ref().is_some_and(|p| p.exists()));
    assert!(report.audio.as_ref().is_some_and(|p| p.exists()));
    assert!(report.subtitles.to_string_lossy().ends_with(".en.srt"));
    assert_eq!(disposed.load(Ordering::SeqCst), 1);

    let source = std::fs::read_to_string(&report.subtitles)?;
    assert_eq!(
        source,
        "1\n00:00:00,000 --> 00:00:01,500\nHello there.\n\n\
         2\n00:00:01,500 --> 00:00:03,000\nGeneral Kenobi.\n\n"
    );

    let translated_path = report.translated.expect("translated file");
    let translated = std::fs::read_to_string(&translated_path)?;
    assert_eq!(
        translated,
        "1\n00:00:00,000 --> 00:00:01,500\n[fr] Hello there.\n\n\
         2\n00:00:01,500 --> 00:00:03,000\n[fr] General Kenobi.\n\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withFlatTranscript_shouldSegmentEvenly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let flat = Transcript::Flat(FlatTranscript::from_text(
        "the quick brown fox jumps over the lazy dog while the cat watches from the fence",
        8.0,
    ));
    let mut controller = controller(
        temp_dir.path(),
        FakeFetcher::working(),
        FakeRecognizer::returning(flat),
        MockProvider::working(),
    );

    let report = controller.run("https://example.com/v/1", &RunOptions::default()).await?;
    assert!(report.translated.is_none());

    let cues = parse_cues(&std::fs::read_to_string(&report.subtitles)?)?;
    assert!(cues.len() >= 2);
    assert_eq!(cues[0].start, 0.0);
    for pair in cues.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert!((cues.last().unwrap().end - 8.0).abs() < 0.002);
    Ok(())
}

#[tokio::test]
async fn test_run_withFetchFailure_shouldReportFetchStage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let recognizer = FakeRecognizer::returning(timed_transcript());
    let initialized = Arc::clone(&recognizer.initialized);
    let mut controller = controller(temp_dir.path(), FakeFetcher::failing(), recognizer, MockProvider::working());

    let err = controller
        .run("https://example.com/private", &RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Fetch));
    assert!(err.to_string().contains("video unavailable"));
    // Later stages never started
    assert_eq!(initialized.load(Ordering::SeqCst), 0);
    assert!(common::list_files(temp_dir.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_withRecognizerFailure_shouldStillDispose() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let recognizer = FakeRecognizer::failing();
    let initialized = Arc::clone(&recognizer.initialized);
    let disposed = Arc::clone(&recognizer.disposed);
    let mut controller = controller(temp_dir.path(), FakeFetcher::working(), recognizer, MockProvider::working());

    let err = controller
        .run("https://example.com/v/2", &RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Transcribe));
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    // Only the media and audio placeholders exist, no caption file
    let files = common::list_files(temp_dir.path());
    assert!(files.iter().all(|p| p.extension().is_some_and(|e| e != "srt")));
    Ok(())
}

#[tokio::test]
async fn test_run_withPlatformSubtitles_shouldSkipRecognition() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let fetcher = FakeFetcher::with_published_subtitles(common::SAMPLE_SRT);
    let fetch_calls = Arc::clone(&fetcher.fetch_calls);
    let recognizer = FakeRecognizer::returning(timed_transcript());
    let initialized = Arc::clone(&recognizer.initialized);
    let mut controller = controller(temp_dir.path(), fetcher, recognizer, MockProvider::working());

    let options = RunOptions {
        translate: true,
        prefer_platform_subtitles: true,
    };
    let report = controller.run("https://example.com/v/3", &options).await?;

    assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(initialized.load(Ordering::SeqCst), 0);
    assert!(report.media.is_none());
    assert!(report.audio.is_none());
    assert_eq!(report.subtitles, temp_dir.path().join("published.en.srt"));

    let translated = std::fs::read_to_string(report.translated.expect("translated file"))?;
    assert!(translated.starts_with("1\n00:00:01,000 --> 00:00:04,000\n[fr] This is a test subtitle.\n"));
    Ok(())
}

#[tokio::test]
async fn test_run_withoutPlatformSubtitles_shouldFallBackToRecognition() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let fetcher = FakeFetcher::working();
    let fetch_calls = Arc::clone(&fetcher.fetch_calls);
    let mut controller = controller(
        temp_dir.path(),
        fetcher,
        FakeRecognizer::returning(timed_transcript()),
        MockProvider::working(),
    );

    let options = RunOptions {
        translate: false,
        prefer_platform_subtitles: true,
    };
    let report = controller.run("https://example.com/v/4", &options).await?;

    assert_eq!(fetch_calls.load(Ordering::SeqCst), 1);
    assert!(report.media.is_some());
    Ok(())
}

#[tokio::test]
async fn test_run_withTranslationFailure_shouldKeepSourceAndWriteNoTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut controller = controller(
        temp_dir.path(),
        FakeFetcher::working(),
        FakeRecognizer::returning(timed_transcript()),
        MockProvider::failing_on("Kenobi"),
    );

    let options = RunOptions {
        translate: true,
        prefer_platform_subtitles: false,
    };
    let err = controller.run("https://example.com/v/5", &options).await.unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Translate));
    match err {
        AppError::Stage { source, .. } => assert!(source.to_string().contains("line 7")),
        other => panic!("unexpected error: {other}"),
    }

    // media, audio and the source-language captions only
    let srt_files: Vec<_> = common::list_files(temp_dir.path())
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "srt"))
        .collect();
    assert_eq!(srt_files.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_transcribe_to_srt_withEmptyTranscript_shouldWriteEmptyFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut controller = controller(
        temp_dir.path(),
        FakeFetcher::working(),
        FakeRecognizer::returning(Transcript::Timed(Vec::new())),
        MockProvider::working(),
    );
    let audio = common::create_test_file(temp_dir.path(), "audio.mp3", "")?;

    let output = controller.transcribe_to_srt(&audio, temp_dir.path()).await?;
    assert_eq!(std::fs::read_to_string(output)?, "");
    Ok(())
}

#[tokio::test]
async fn test_run_withUnreachableTranslator_shouldFailBeforeFetching() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let fetcher = FakeFetcher::working();
    let fetch_calls = Arc::clone(&fetcher.fetch_calls);
    let recognizer = FakeRecognizer::returning(timed_transcript());
    let initialized = Arc::clone(&recognizer.initialized);
    let mut controller = controller(temp_dir.path(), fetcher, recognizer, MockProvider::failing());

    let options = RunOptions {
        translate: true,
        prefer_platform_subtitles: false,
    };
    let err = controller
        .run("https://example.com/watch?v=abc", &options)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Translate));
    assert!(err.to_string().contains("not reachable"));
    assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(initialized.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withUnreachableTranslatorAndNoTranslation_shouldStillWriteCaptions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let recognizer = FakeRecognizer::returning(timed_transcript());
    let mut controller = controller(temp_dir.path(), FakeFetcher::working(), recognizer, MockProvider::failing());

    let report = controller
        .run("https://example.com/watch?v=abc", &RunOptions::default())
        .await?;

    assert!(report.subtitles.exists());
    assert!(report.translated.is_none());
    Ok(())
}
