use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// One question posed to the answering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub topic: String,
    pub question: String,
}

impl AskRequest {
    pub fn new(topic: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            question: question.into(),
        }
    }
}

/// The answering service's reply payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type EndpointResult<T> = Result<T, EndpointError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EndpointError {
    #[snafu(display("failed to build the assistant http client"))]
    BuildHttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("assistant request failed on `{stage}`, {source}"))]
    SendRequest {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("assistant endpoint returned status {status}: {body}"))]
    UnexpectedStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode the assistant answer payload"))]
    DecodeAnswer {
        stage: &'static str,
        source: reqwest::Error,
    },
}

/// Boundary to the answering service.
///
/// The core only distinguishes "success with an answer" from "failure"; the
/// failure kind stays opaque to callers.
pub trait AnswerEndpoint: Send + Sync {
    fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, EndpointResult<AskResponse>>;
}
