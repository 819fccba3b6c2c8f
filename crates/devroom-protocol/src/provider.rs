//! The completion provider boundary
//!
//! The provider is an opaque prompt-in, raw-text-out service. Its output
//! shape is non-deterministic and its latency is unbounded, so the only
//! entry point consumers should use is [`complete`], which bounds the call
//! with a timeout and funnels every failure mode into the synthesized
//! fallback object. Downstream code never sees a provider error.

use crate::extract::{extract_json, fallback_text, PROVIDER_ERROR_NOTICE};
use std::time::Duration;

/// Provider-side failure
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be completed
    #[error("provider request failed: {0}")]
    Request(String),
    /// The provider is not reachable/configured
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Opaque text-completion service
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One free-form prompt in, one raw text blob out
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Run one completion and return guaranteed-valid reply JSON.
///
/// The provider call is awaited under `timeout`. A timely reply goes
/// through [`extract_json`]; an error or a timeout substitutes the
/// [`PROVIDER_ERROR_NOTICE`] text object. Either way the result parses.
pub async fn complete(
    provider: &dyn CompletionProvider,
    prompt: &str,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, provider.generate(prompt)).await {
        Ok(Ok(raw)) => extract_json(&raw),
        Ok(Err(err)) => {
            tracing::warn!(%err, "provider call failed; substituting fallback reply");
            fallback_text(PROVIDER_ERROR_NOTICE)
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "provider call timed out; substituting fallback reply"
            );
            fallback_text(PROVIDER_ERROR_NOTICE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::AiResponse;

    struct CannedProvider(&'static str);

    #[async_trait::async_trait]
    impl CompletionProvider for CannedProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_owned())
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for FailingProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Request("boom".to_owned()))
        }
    }

    struct StalledProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for StalledProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn timely_reply_is_extracted() {
        let provider = CannedProvider(r#"noise {"text":"hi"} noise"#);
        let out = complete(&provider, "p", Duration::from_secs(5)).await;
        assert_eq!(out, r#"{"text":"hi"}"#);
    }

    #[tokio::test]
    async fn provider_error_becomes_fallback_text() {
        let out = complete(&FailingProvider, "p", Duration::from_secs(5)).await;
        let reply = AiResponse::parse(&out).unwrap();
        assert_eq!(reply.text(), PROVIDER_ERROR_NOTICE);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_into_fallback() {
        let out = complete(&StalledProvider, "p", Duration::from_secs(30)).await;
        let reply = AiResponse::parse(&out).unwrap();
        assert_eq!(reply.text(), PROVIDER_ERROR_NOTICE);
    }
}
