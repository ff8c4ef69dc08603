//! HTTP client for the condition-parsing service.
//!
//! This is the only place that interprets status codes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ConditionParser, ParsedCondition};
use crate::config::ParserConfig;
use crate::errors::{ParserError, ParserResult};

const USER_AGENT_VALUE: &str = concat!("pics-core/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct ParseOneRequest<'a> {
    expression: &'a str,
}

#[derive(Serialize)]
struct ParseBatchRequest<'a> {
    expressions: &'a [String],
}

#[derive(Deserialize)]
struct ParseBatchResponse {
    results: Vec<ParsedCondition>,
}

/// Client for `POST {base}/parse` and `POST {base}/parse/batch`.
#[derive(Debug, Clone)]
pub struct HttpConditionParser {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl HttpConditionParser {
    pub fn new(config: &ParserConfig) -> ParserResult<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ParserError::Unavailable {
                message: "parser url not configured".to_string(),
            })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ParserError::Unavailable {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ParserResult<reqwest::Response> {
        use rand::Rng;

        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0;

        loop {
            match self.post_once(&url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        ParserError::RateLimited {
                            retry_after: Some(retry_after),
                        } => (*retry_after).min(Duration::from_secs(30)),
                        _ => {
                            let base = Duration::from_millis(250 << retries.min(6))
                                .min(Duration::from_secs(30));
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying condition parser request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B: Serialize + Sync + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> ParserResult<reqwest::Response> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ParserError::RateLimited { retry_after })
            }

            400..=499 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ParserError::InvalidResponse {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ParserError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

#[async_trait]
impl ConditionParser for HttpConditionParser {
    async fn parse_one(&self, expression: &str) -> ParserResult<ParsedCondition> {
        debug!(url = %self.base_url, "parsing single condition");
        let response = self
            .post_json("/parse", &ParseOneRequest { expression })
            .await?;
        response
            .json()
            .await
            .map_err(|e| ParserError::InvalidResponse {
                message: format!("failed to parse condition response: {}", e),
            })
    }

    async fn parse_batch(&self, expressions: &[String]) -> ParserResult<Vec<ParsedCondition>> {
        debug!(url = %self.base_url, count = expressions.len(), "parsing condition batch");
        let response = self
            .post_json("/parse/batch", &ParseBatchRequest { expressions })
            .await?;
        let body: ParseBatchResponse =
            response
                .json()
                .await
                .map_err(|e| ParserError::InvalidResponse {
                    message: format!("failed to parse batch response: {}", e),
                })?;
        Ok(body.results)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}
