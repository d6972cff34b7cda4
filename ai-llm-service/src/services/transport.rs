//! Request plumbing shared by the provider clients.

use std::time::Instant;

use reqwest::{RequestBuilder, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, ProviderError, ProviderErrorKind, is_http_endpoint, make_snippet,
    },
};

/// Checks that `cfg` targets `provider` over http(s) and builds a client
/// with the configured timeout.
///
/// Returns the client and the endpoint with trailing slashes removed.
pub(crate) fn client_for(
    provider: LlmProvider,
    cfg: &LlmModelConfig,
) -> Result<(reqwest::Client, String), AiLlmError> {
    if cfg.provider != provider {
        return Err(ProviderError::new(provider, ProviderErrorKind::InvalidProvider).into());
    }
    if !is_http_endpoint(&cfg.endpoint) {
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }

    let client = reqwest::Client::builder()
        .timeout(cfg.timeout())
        .gzip(true)
        .brotli(true)
        .build()?;
    let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
    Ok((client, base))
}

/// Sends `body` as JSON and decodes a 2xx response into `R`.
///
/// `expected` names the response field the caller reads; it ends up in the
/// decode error so a schema drift is obvious in logs.
pub(crate) async fn post_json<B, R>(
    cfg: &LlmModelConfig,
    request: RequestBuilder,
    url: &str,
    body: &B,
    expected: &str,
) -> Result<R, AiLlmError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let provider = cfg.provider;
    let started = Instant::now();
    debug!(%provider, "POST {url}");

    let resp = request
        .header(header::CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| AiLlmError::from_transport(e, cfg.timeout()))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&text);
        error!(
            %provider,
            %status,
            %url,
            %snippet,
            latency_ms = started.elapsed().as_millis(),
            "generation request returned non-success status"
        );
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            }),
        )
        .into());
    }

    let out = resp.json::<R>().await.map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!("serde error: {e}; expected `{expected}`")),
        )
    })?;
    debug!(%provider, latency_ms = started.elapsed().as_millis(), "response decoded");
    Ok(out)
}

/// `Some(text)` when the model produced anything other than whitespace.
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

pub(crate) fn empty_response(provider: LlmProvider) -> AiLlmError {
    ProviderError::new(provider, ProviderErrorKind::EmptyResponse).into()
}
