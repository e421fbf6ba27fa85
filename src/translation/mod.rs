/*!
 * Translation of caption files, one text line at a time.
 *
 * This module is split into several submodules:
 *
 * - `core`: Translation service wrapping the configured backend
 * - `rewriter`: Line-preserving caption rewrite with bounded concurrency
 * - `cache`: Caching of repeated lines
 * - `concurrency`: Backend-specific concurrency defaults
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

// Re-export main types for easier usage
pub use self::core::TranslationService;
pub use self::rewriter::{rewrite_caption, rewrite_caption_with_progress, translate_file, RewriteOptions};

/// Anything that can turn one line of text into the target language
///
/// Implementations must be safe to call concurrently; the rewriter keeps
/// several calls in flight at once.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language`
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;

    /// Check that the backend is reachable before any line is sent
    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

// Submodules
pub mod cache;
pub mod concurrency;
pub mod core;
pub mod rewriter;
