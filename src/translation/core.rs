/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which wraps the
 * configured backend behind the `Translator` trait and caches repeated lines.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::google::{GoogleRequest, GoogleTranslate};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::Provider;
use super::cache::TranslationCache;
use super::concurrency::ProviderProfile;
use super::Translator;

/// Check that an endpoint is an absolute http(s) URL
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }

    Ok(url)
}

/// Translation provider implementation variants
enum TranslationProviderImpl {
    /// Google web translation endpoint
    Google {
        /// Client instance
        client: GoogleTranslate,
    },

    /// Ollama LLM service
    Ollama {
        /// Client instance
        client: Ollama,
        /// Model name
        model: String,
        /// System prompt with language placeholders already filled in
        system_prompt: String,
        /// Sampling temperature
        temperature: f32,
    },
}

/// Main translation service for caption lines
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Which backend was configured
    provider_type: ConfigTranslationProvider,

    /// Source language code, part of every cache key
    source_language: String,

    /// Number of lines to keep in flight at once
    max_concurrent_requests: usize,

    /// Translation cache for repeated lines
    pub cache: TranslationCache,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: &TranslationConfig, source_language: &str) -> Result<Self> {
        let endpoint = parse_endpoint(&config.get_endpoint())?;
        let endpoint = endpoint.as_str().trim_end_matches('/').to_string();
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::Google => TranslationProviderImpl::Google {
                client: GoogleTranslate::new(endpoint, timeout_secs),
            },
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::from_url(endpoint, timeout_secs),
                model: config.get_model(),
                system_prompt: config.common.system_prompt.replace(
                    "{source_language}",
                    &language_name(source_language),
                ),
                temperature: config.common.temperature,
            },
        };

        let profile = ProviderProfile::for_provider(config.provider);
        let max_concurrent_requests =
            profile.effective_concurrent_requests(config.get_concurrent_requests());

        info!(
            "Translation backend: {} ({} concurrent requests)",
            config.provider.display_name(),
            max_concurrent_requests
        );

        Ok(Self {
            provider,
            provider_type: config.provider,
            source_language: source_language.to_string(),
            max_concurrent_requests,
            cache: TranslationCache::new(config.common.cache_enabled),
        })
    }

    /// Configured backend
    pub fn provider(&self) -> ConfigTranslationProvider {
        self.provider_type
    }

    /// Number of lines to keep in flight at once
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    async fn translate_uncached(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        match &self.provider {
            TranslationProviderImpl::Google { client } => {
                let request = GoogleRequest::new(text, target_language)
                    .source_language(self.source_language.as_str());
                let response = client.complete(request).await?;
                Ok(GoogleTranslate::extract_text(&response))
            }
            TranslationProviderImpl::Ollama {
                client,
                model,
                system_prompt,
                temperature,
            } => {
                let system = system_prompt.replace("{target_language}", &language_name(target_language));
                let request = GenerationRequest::new(model.as_str(), text)
                    .system(system)
                    .temperature(*temperature);
                let response = client.complete(request).await?;
                Ok(Ollama::extract_text(&response))
            }
        }
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        if let Some(cached) = self.cache.get(text, &self.source_language, target_language) {
            return Ok(cached);
        }

        let translated = self.translate_uncached(text, target_language).await?;
        debug!("Translated '{}' -> '{}'", text, translated);
        if !translated.trim().is_empty() {
            self.cache
                .store(text, &self.source_language, target_language, &translated);
        }
        Ok(translated)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let result = match &self.provider {
            TranslationProviderImpl::Google { client } => client.test_connection().await,
            TranslationProviderImpl::Ollama { client, .. } => client.test_connection().await,
        };
        if let Err(e) = &result {
            warn!("{} is not reachable: {}", self.provider_type.display_name(), e);
        }
        result
    }
}

/// Human-readable language name for prompts, falling back to the raw code
fn language_name(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}
