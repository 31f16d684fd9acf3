//! Clients for the external translation and image-reading services.
//!
//! Both are optional helpers for building cards. Credentials come from the
//! environment, endpoints from [`Config`](crate::config::Config).

mod extract;
mod translate;

pub use extract::{
    media_type_for, parse_underlined, AnthropicExtractor, UnderlineExtractor, UnderlinedPhrase,
};
pub use translate::{DeepLClient, TranslationSuggester};

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{Error, Result};

pub const DEEPL_KEY_VAR: &str = "DEEPL_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Read a credential from the environment
pub fn api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            log::warn!("{var} is not set");
            Err(Error::Service(format!("{var} is not set")))
        }
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Service(format!("HTTP client build failed: {e}")))
}

pub(crate) fn ensure_success(service: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    log::error!("{service} returned {status}: {body}");
    Err(Error::Service(format!("{service} returned {status}")))
}
