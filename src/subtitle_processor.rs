use std::fmt;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, SubtitleError};
use crate::file_utils::FileManager;

// @module: Caption file synthesis, rendering and line classification

// @const: Timing separator token
pub const TIMING_SEPARATOR: &str = "-->";

// @const: SRT timing line regex, hours unbounded
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2,}:\d{2}:\d{2},\d{3})$")
        .expect("timing regex is valid")
});

/// Format a second offset as an SRT timestamp (`HH:MM:SS,mmm`)
///
/// Milliseconds are truncated toward zero, not rounded, so floating-point
/// representation error is reproduced as-is (e.g. `2.3` gives `,299`).
/// Hours are zero-padded to two digits and never wrap.
pub fn format_timestamp(seconds: f64) -> Result<String, SubtitleError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SubtitleError::InvalidTimestamp(seconds));
    }

    let millis = ((seconds % 1.0) * 1000.0).trunc() as u64;
    let whole = seconds.trunc() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;

    Ok(format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis))
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) back into seconds
pub fn parse_timestamp(timestamp: &str) -> Result<f64, SubtitleError> {
    let malformed = || SubtitleError::MalformedTiming(timestamp.to_string());
    let parts: Vec<&str> = timestamp.trim().split([':', ',']).collect();
    if parts.len() != 4 {
        return Err(malformed());
    }

    let hours: u64 = parts[0].parse().map_err(|_| malformed())?;
    let minutes: u64 = parts[1].parse().map_err(|_| malformed())?;
    let seconds: u64 = parts[2].parse().map_err(|_| malformed())?;
    let millis: u64 = parts[3].parse().map_err(|_| malformed())?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(malformed());
    }

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Parse a full timing line into `(start, end)` seconds
pub fn parse_timing_line(line: &str) -> Result<(f64, f64), SubtitleError> {
    let caps = TIMING_REGEX
        .captures(line.trim())
        .ok_or_else(|| SubtitleError::MalformedTiming(line.to_string()))?;
    Ok((parse_timestamp(&caps[1])?, parse_timestamp(&caps[2])?))
}

// @struct: One caption block
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: Display index, 1-based and contiguous
    pub index: usize,

    // @field: Start offset in seconds
    pub start: f64,

    // @field: End offset in seconds
    pub end: f64,

    // @field: Display text, may span several lines
    pub text: String,
}

impl Cue {
    /// Creates a cue without checking invariants
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Cue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    // @creates: Validated cue
    // @validates: Non-negative ordered times and non-empty text
    pub fn new_validated(index: usize, start: f64, end: f64, text: &str) -> Result<Self, SubtitleError> {
        if !start.is_finite() || start < 0.0 {
            return Err(SubtitleError::InvalidTimestamp(start));
        }
        if !end.is_finite() || end < start {
            return Err(SubtitleError::InvalidTimestamp(end));
        }

        let text = trim_blank_lines(text);
        if text.is_empty() {
            return Err(SubtitleError::EmptyInput("cue text"));
        }

        Ok(Cue::new(index, start, end, text))
    }

    /// Render the `start --> end` line of this cue
    pub fn timing_line(&self) -> Result<String, SubtitleError> {
        Ok(format!(
            "{} {} {}",
            format_timestamp(self.start)?,
            TIMING_SEPARATOR,
            format_timestamp(self.end)?
        ))
    }

    /// Render this cue as an SRT block, terminated by exactly one blank line
    pub fn render(&self) -> Result<String, SubtitleError> {
        let text = self.text.trim_end_matches(['\r', '\n']);
        Ok(format!("{}\n{}\n{}\n\n", self.index, self.timing_line()?, text))
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.render() {
            Ok(block) => write!(f, "{}", block),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Strip leading and trailing blank lines, keeping inner line structure
fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Serialize cues into caption-file text
///
/// The renderer trusts its input: indices and ordering are written as given.
pub fn render_cues(cues: &[Cue]) -> Result<String, SubtitleError> {
    let mut output = String::new();
    for cue in cues {
        output.push_str(&cue.render()?);
    }
    Ok(output)
}

/// Render cues and write them to `path`, creating parent directories
pub fn write_to_srt<P: AsRef<Path>>(cues: &[Cue], path: P) -> Result<(), AppError> {
    let path = path.as_ref();
    let content = render_cues(cues)?;
    FileManager::write_to_file(path, &content)?;
    debug!("Wrote {} cues to {:?}", cues.len(), path);
    Ok(())
}

// @struct: Time-aligned ASR output segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    // @field: Identifier assigned by the recognizer, not trusted for ordering
    #[serde(default)]
    pub id: i64,

    // @field: Start offset in seconds
    pub start: f64,

    // @field: End offset in seconds
    pub end: f64,

    // @field: Recognized text
    pub text: String,
}

/// Turn time-aligned ASR segments into well-formed cues
///
/// Segments are ordered by start time and indexed by their final position,
/// never by the recognizer's own identifiers. Segments with blank text are
/// dropped and an end before the start is clamped to the start.
pub fn cues_from_segments(segments: &[TimedSegment]) -> Result<Vec<Cue>, SubtitleError> {
    let mut ordered: Vec<&TimedSegment> = segments.iter().collect();
    for segment in &ordered {
        if !segment.start.is_finite() || segment.start < 0.0 {
            return Err(SubtitleError::InvalidTimestamp(segment.start));
        }
        if !segment.end.is_finite() {
            return Err(SubtitleError::InvalidTimestamp(segment.end));
        }
    }
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut cues = Vec::with_capacity(ordered.len());
    for segment in ordered {
        let text = trim_blank_lines(segment.text.trim());
        if text.is_empty() {
            debug!("Dropping empty segment {}", segment.id);
            continue;
        }

        let end = if segment.end < segment.start {
            warn!(
                "Segment {} ends before it starts ({} < {}), clamping",
                segment.id, segment.end, segment.start
            );
            segment.start
        } else {
            segment.end
        };

        cues.push(Cue::new(cues.len() + 1, segment.start, end, text));
    }

    Ok(cues)
}

// @enum: Structural role of a caption-file line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Index,
    Timing,
    Text,
}

/// Classify one physical line, independent of its position
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.chars().all(|c| c.is_ascii_digit()) {
        LineKind::Index
    } else if trimmed.contains(TIMING_SEPARATOR) {
        LineKind::Timing
    } else {
        LineKind::Text
    }
}

// @struct: A physical line tagged with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    // @field: 1-based position in the file
    pub line_number: usize,

    // @field: Raw line content, without its terminator
    pub content: String,

    // @field: Classification
    pub kind: LineKind,
}

/// Classify every line of caption-file text, keeping order and content
pub fn classify_lines(text: &str) -> Vec<ClassifiedLine> {
    text.lines()
        .enumerate()
        .map(|(i, line)| ClassifiedLine {
            line_number: i + 1,
            content: line.to_string(),
            kind: classify_line(line),
        })
        .collect()
}

// @struct: Classified caption file
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCaption {
    // @field: Lines in file order
    pub lines: Vec<ClassifiedLine>,

    // @field: Whether the source text ended with a line terminator
    pub trailing_newline: bool,
}

impl ClassifiedCaption {
    /// Classify caption-file text, ignoring a leading byte-order mark
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        ClassifiedCaption {
            lines: classify_lines(text),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Read and classify a caption file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&content))
    }

    // @returns: Number of lines of the given kind
    pub fn count(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|l| l.kind == kind).count()
    }
}

/// Parse caption-file text back into cues
///
/// Blocks are delimited by blank lines; inside a block the first line is
/// the index, the second the timing line, and every further line is text
/// whatever its classification (a caption may legitimately read "42").
pub fn parse_cues(text: &str) -> Result<Vec<Cue>, SubtitleError> {
    let lines = classify_lines(text);
    let mut cues = Vec::new();
    let mut block: Vec<&ClassifiedLine> = Vec::new();

    for line in &lines {
        if line.kind != LineKind::Blank {
            block.push(line);
            continue;
        }
        if !block.is_empty() {
            cues.push(parse_block(&block)?);
            block.clear();
        }
    }
    if !block.is_empty() {
        cues.push(parse_block(&block)?);
    }

    Ok(cues)
}

fn parse_block(block: &[&ClassifiedLine]) -> Result<Cue, SubtitleError> {
    let head = block[0];
    if head.kind != LineKind::Index {
        return Err(SubtitleError::MalformedCue {
            line_number: head.line_number,
            reason: format!("expected an index line, found '{}'", head.content.trim()),
        });
    }
    let index: usize = head.content.trim().parse().map_err(|_| SubtitleError::MalformedCue {
        line_number: head.line_number,
        reason: format!("index '{}' out of range", head.content.trim()),
    })?;

    let timing = block.get(1).ok_or_else(|| SubtitleError::MalformedCue {
        line_number: head.line_number,
        reason: "missing timing line".to_string(),
    })?;
    if timing.kind != LineKind::Timing {
        return Err(SubtitleError::MalformedCue {
            line_number: timing.line_number,
            reason: format!("expected a timing line, found '{}'", timing.content.trim()),
        });
    }
    let (start, end) = parse_timing_line(&timing.content)?;

    if block.len() < 3 {
        return Err(SubtitleError::MalformedCue {
            line_number: timing.line_number,
            reason: "cue has no text".to_string(),
        });
    }
    let text = block[2..]
        .iter()
        .map(|l| l.content.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Cue::new(index, start, end, text))
}
