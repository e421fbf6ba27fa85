/*!
 * Fixed-rate segmentation of untimed transcripts.
 *
 * Some recognizers return only flat text plus the audio duration. This module
 * turns such output into contiguous cues by assuming a uniform speaking rate
 * and closing a cue whenever its text reaches a character budget.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::subtitle_processor::Cue;

/// Default character budget per cue
pub const DEFAULT_MAX_CHARS_PER_LINE: usize = 40;

/// Untimed recognizer output: ordered words and total duration in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTranscript {
    /// Words in spoken order
    pub words: Vec<String>,
    /// Duration of the audio the words were recognized from
    pub duration: f64,
}

impl FlatTranscript {
    /// Build a transcript by splitting raw text on whitespace
    pub fn from_text(text: &str, duration: f64) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            duration,
        }
    }

    /// Segment this transcript into cues
    pub fn to_cues(&self, max_chars_per_line: usize) -> Result<Vec<Cue>, SubtitleError> {
        segment_words(&self.words, self.duration, max_chars_per_line)
    }
}

/// Synthesize evenly paced cues from words spoken over `duration` seconds
///
/// A cue closes once its joined text reaches `max_chars_per_line` characters
/// or the last word is consumed. Words are never split, so one long word
/// becomes a cue of its own. Cues are contiguous: each starts where the
/// previous one ended. Blank entries are skipped and surrounding whitespace
/// is trimmed, so a word list with nothing to say yields no cues.
pub fn segment_words<S: AsRef<str>>(
    words: &[S],
    duration: f64,
    max_chars_per_line: usize,
) -> Result<Vec<Cue>, SubtitleError> {
    let words: Vec<&str> = words
        .iter()
        .map(|word| word.as_ref().trim())
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SubtitleError::NonPositiveDuration(duration));
    }
    if max_chars_per_line == 0 {
        return Err(SubtitleError::ZeroLineBudget);
    }

    let words_per_second = words.len() as f64 / duration;
    let last = words.len() - 1;

    let mut cues = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut line_length = 0usize;
    let mut start = 0.0;

    for (i, word) in words.iter().copied().enumerate() {
        if !current.is_empty() {
            line_length += 1;
        }
        line_length += word.chars().count();
        current.push(word);

        if line_length >= max_chars_per_line || i == last {
            let end = start + current.len() as f64 / words_per_second;
            cues.push(Cue::new(cues.len() + 1, start, end, current.join(" ")));
            current.clear();
            line_length = 0;
            start = end;
        }
    }

    debug!(
        "Segmented {} words over {:.3}s into {} cues",
        words.len(),
        duration,
        cues.len()
    );
    Ok(cues)
}
