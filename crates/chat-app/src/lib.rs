pub mod controller;
pub mod settings;

pub use controller::{
    ChatController, ExchangeTicket, PipelineError, PipelineResult, SendOutcome, SessionSummary,
};
pub use settings::{AppSettings, ENDPOINT_URL_ENV_VAR, SettingsError, SettingsStore};
