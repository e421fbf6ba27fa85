/*!
 * Line-preserving caption rewrite.
 *
 * Only TEXT lines are sent to the translator, one physical line per call.
 * Index, timing and blank lines are copied through after trimming, so the
 * structure of the output matches the input line for line. Calls run with
 * bounded concurrency and are reassembled in file order; the first failure
 * aborts the rewrite and nothing is written.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{AppError, ProviderError, TranslationError};
use crate::file_utils::FileManager;
use crate::subtitle_processor::{ClassifiedCaption, ClassifiedLine, LineKind};
use super::Translator;

/// Knobs for a rewrite pass
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Maximum number of translator calls in flight
    pub max_concurrent_requests: usize,

    /// Deadline for each translator call
    pub request_timeout: Option<Duration>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Rewrite a classified caption into `target_language`
pub async fn rewrite_caption<T: Translator + ?Sized>(
    caption: &ClassifiedCaption,
    translator: &T,
    target_language: &str,
    options: &RewriteOptions,
) -> Result<String, TranslationError> {
    rewrite_caption_with_progress(caption, translator, target_language, options, &|_: usize, _: usize| {}).await
}

/// Rewrite a classified caption, reporting `(translated, total)` after every line
pub async fn rewrite_caption_with_progress<T: Translator + ?Sized>(
    caption: &ClassifiedCaption,
    translator: &T,
    target_language: &str,
    options: &RewriteOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<String, TranslationError> {
    // Structural lines are final already; TEXT slots are filled in below
    let mut output: Vec<String> = caption
        .lines
        .iter()
        .map(|line| match line.kind {
            LineKind::Index | LineKind::Timing => line.content.trim().to_string(),
            LineKind::Text | LineKind::Blank => String::new(),
        })
        .collect();

    let text_lines: Vec<(usize, &ClassifiedLine)> = caption
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.kind == LineKind::Text)
        .collect();
    let total = text_lines.len();
    let finished = AtomicUsize::new(0);
    let concurrency = options.max_concurrent_requests.max(1);

    debug!(
        "Rewriting {} text lines of {} into {} ({} in flight)",
        total,
        caption.lines.len(),
        target_language,
        concurrency
    );

    let translations: Vec<(usize, String)> = stream::iter(text_lines)
        .map(|(position, line)| {
            let finished = &finished;
            async move {
                let content = line.content.trim();
                let translated = translate_line(translator, content, target_language, options.request_timeout)
                    .await
                    .map_err(|source| {
                        warn!("Line {} failed to translate: {}", line.line_number, source);
                        TranslationError::Line {
                            line_number: line.line_number,
                            content: content.to_string(),
                            source,
                        }
                    })?;

                let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                progress(done, total);
                Ok::<_, TranslationError>((position, translated))
            }
        })
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

    for (position, translated) in translations {
        output[position] = translated;
    }

    let mut result = output.join("\n");
    if caption.trailing_newline {
        result.push('\n');
    }
    Ok(result)
}

/// Translate one trimmed line, folding the answer back onto a single line
async fn translate_line<T: Translator + ?Sized>(
    translator: &T,
    text: &str,
    target_language: &str,
    request_timeout: Option<Duration>,
) -> Result<String, ProviderError> {
    let call = translator.translate(text, target_language);
    let translated = match request_timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ProviderError::Timeout(limit.as_secs()))??,
        None => call.await?,
    };

    // A line break inside a translation would shift every later line
    let folded = translated
        .lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if folded.is_empty() {
        return Err(ProviderError::ParseError(format!(
            "empty translation for '{}'",
            text
        )));
    }
    Ok(folded)
}

/// Translate a caption file into a new sibling file
///
/// The source is never modified. The result lands at
/// `<stem>_<unique token>.<ext>` next to it, written atomically and only
/// once every line translated.
pub async fn translate_file<P: AsRef<Path>, T: Translator + ?Sized>(
    path: P,
    translator: &T,
    target_language: &str,
    options: &RewriteOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<PathBuf, AppError> {
    let path = path.as_ref();
    let caption = ClassifiedCaption::from_file(path)?;
    info!(
        "Translating {:?}: {} text lines into {}",
        path,
        caption.count(LineKind::Text),
        target_language
    );

    let rewritten =
        rewrite_caption_with_progress(&caption, translator, target_language, options, progress).await?;

    let output_path = FileManager::translated_sibling_path(path);
    FileManager::write_atomically(&output_path, &rewritten).map_err(|source| TranslationError::Persist {
        path: output_path.clone(),
        source,
    })?;

    info!("Translated subtitles written to {:?}", output_path);
    Ok(output_path)
}
