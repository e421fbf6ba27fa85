/*!
 * Tests for flat transcript segmentation
 */

use ytaisub::segmenter::{segment_words, FlatTranscript, DEFAULT_MAX_CHARS_PER_LINE};
use ytaisub::subtitle_processor::{parse_cues, render_cues};

#[test]
fn test_segment_words_thenRender_shouldProduceExpectedCaption() {
    let cues = segment_words(&["aaaa", "bbbb", "cccc"], 3.0, 9).unwrap();
    let rendered = render_cues(&cues).unwrap();
    assert_eq!(
        rendered,
        "1\n00:00:00,000 --> 00:00:02,000\naaaa bbbb\n\n\
         2\n00:00:02,000 --> 00:00:03,000\ncccc\n\n"
    );
}

#[test]
fn test_segmented_caption_shouldParseBackIntoSameCues() {
    let transcript = FlatTranscript::from_text("one two three four five six seven eight", 8.0);
    let cues = transcript.to_cues(10).unwrap();
    let parsed = parse_cues(&render_cues(&cues).unwrap()).unwrap();
    assert_eq!(parsed, cues);
}

#[test]
fn test_segment_words_withDefaultBudget_shouldKeepCuesShort() {
    let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod \
                tempor incididunt ut labore et dolore magna aliqua";
    let transcript = FlatTranscript::from_text(text, 12.0);
    let cues = transcript.to_cues(DEFAULT_MAX_CHARS_PER_LINE).unwrap();

    assert!(cues.len() > 1);
    for cue in &cues {
        // A cue only overshoots the budget by the word that closed it
        let without_last = cue.text.rsplit_once(' ').map(|(head, _)| head).unwrap_or("");
        assert!(without_last.chars().count() < DEFAULT_MAX_CHARS_PER_LINE);
    }
    assert_eq!(cues.first().unwrap().start, 0.0);
    assert!((cues.last().unwrap().end - 12.0).abs() < 1e-9);
}

#[test]
fn test_segment_words_withMultibyteText_shouldCountCharacters() {
    // Ten bytes but only five characters, so the budget is not reached yet
    let cues = segment_words(&["ééééé", "à"], 2.0, 7).unwrap();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "ééééé à");
}

#[test]
fn test_flat_transcript_withNoWords_shouldYieldNoCues() {
    let transcript = FlatTranscript::from_text("   ", 0.0);
    assert!(transcript.to_cues(DEFAULT_MAX_CHARS_PER_LINE).unwrap().is_empty());
}

#[test]
fn test_flat_transcript_withBlankWords_shouldRenderParseableCaption() {
    let transcript = FlatTranscript {
        words: vec!["".to_string(), " ".to_string(), "hi".to_string(), "".to_string(), "there".to_string()],
        duration: 2.0,
    };
    let cues = transcript.to_cues(DEFAULT_MAX_CHARS_PER_LINE).unwrap();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "hi there");

    let parsed = parse_cues(&render_cues(&cues).unwrap()).unwrap();
    assert_eq!(parsed, cues);
}

#[test]
fn test_flat_transcript_withOnlyEmptyWords_shouldYieldNoCues() {
    let transcript = FlatTranscript {
        words: vec![String::new(), String::new()],
        duration: 2.0,
    };
    assert!(transcript.to_cues(DEFAULT_MAX_CHARS_PER_LINE).unwrap().is_empty());
}
