/*!
 * Provider-specific concurrency tuning.
 *
 * Each backend gets a default number of lines kept in flight at once,
 * which the user may override per provider in the config file.
 */

use crate::app_config::TranslationProvider;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
}

impl ProviderProfile {
    /// Get the profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::Google => Self {
                // Public endpoint answers bursts with 429
                max_concurrent_requests: 4,
            },
            TranslationProvider::Ollama => Self {
                // Local server, bounded by the machine
                max_concurrent_requests: 8,
            },
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .filter(|n| *n > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}
