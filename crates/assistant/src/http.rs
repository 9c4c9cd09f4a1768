use std::time::Duration;

use snafu::ResultExt;

use super::endpoint::{
    AnswerEndpoint, AskRequest, AskResponse, BoxFuture, BuildHttpClientSnafu, DecodeAnswerSnafu,
    EndpointResult, SendRequestSnafu, UnexpectedStatusSnafu,
};

/// Default address of the answering service.
pub const DEFAULT_ENDPOINT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default per-request timeout. Retrieval-backed answers can take a while.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const ASK_PATH: &str = "/api/ask/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_BASE_URL)
    }
}

/// `reqwest`-backed client for the answering service's ask endpoint.
pub struct HttpAnswerEndpoint {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl HttpAnswerEndpoint {
    pub fn new(config: EndpointConfig) -> EndpointResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context(BuildHttpClientSnafu {
                stage: "build-http-client",
            })?;

        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn post_ask(&self, request: AskRequest) -> EndpointResult<AskResponse> {
        let url = ask_url(&self.config.base_url);
        tracing::debug!(
            url = %url,
            topic = %request.topic,
            question_chars = request.question.chars().count(),
            "sending ask request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-ask-request",
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                "ask request rejected by the endpoint"
            );
            return UnexpectedStatusSnafu {
                stage: "ask-http-status",
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        response.json::<AskResponse>().await.context(DecodeAnswerSnafu {
            stage: "decode-ask-response",
        })
    }
}

impl AnswerEndpoint for HttpAnswerEndpoint {
    fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, EndpointResult<AskResponse>> {
        Box::pin(self.post_ask(request))
    }
}

fn ask_url(base_url: &str) -> String {
    format!("{}{ASK_PATH}", base_url.trim_end_matches('/'))
}
