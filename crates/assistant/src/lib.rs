pub mod endpoint;
pub mod http;
pub mod topics;

pub use endpoint::{
    AnswerEndpoint, AskRequest, AskResponse, BoxFuture, EndpointError, EndpointResult,
};
pub use http::{
    DEFAULT_ENDPOINT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, EndpointConfig, HttpAnswerEndpoint,
};
pub use topics::{Topic, builtin_topics, display_name_for};
