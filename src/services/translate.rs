use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use super::{api_key, ensure_success, http_client, DEEPL_KEY_VAR};
use crate::config::Config;
use crate::error::{Error, Result};

/// Proposes a translation while a card is being written
pub trait TranslationSuggester {
    fn suggest(&self, text: &str, target_iso: &str) -> Result<String>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    target_lang: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
}

pub struct DeepLClient {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
}

impl DeepLClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Client for the configured endpoint, keyed from `DEEPL_API_KEY`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.deepl_api_url.clone(),
            api_key(DEEPL_KEY_VAR)?,
            config.request_timeout_secs,
        )
    }
}

impl TranslationSuggester for DeepLClient {
    fn suggest(&self, text: &str, target_iso: &str) -> Result<String> {
        let (text, target_iso) = (text.trim(), target_iso.trim());
        if text.is_empty() || target_iso.is_empty() {
            return Err(Error::validation("Text and target language are required."));
        }

        let body = TranslateRequest {
            text: [text],
            target_lang: target_iso.to_uppercase(),
        };
        log::debug!("requesting {} translation from {}", body.target_lang, self.url);

        let resp = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()?;
        let parsed: TranslateResponse = ensure_success("DeepL", resp)?.json()?;
        first_translation(parsed)
    }
}

fn first_translation(resp: TranslateResponse) -> Result<String> {
    resp.translations
        .into_iter()
        .next()
        .map(|t| t.text)
        .ok_or_else(|| Error::Service("DeepL returned no translations".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn client() -> DeepLClient {
        DeepLClient::new("http://127.0.0.1:9/translate", "key", 1).unwrap()
    }

    #[test]
    fn blank_input_is_rejected_before_any_request() {
        assert_matches!(client().suggest("  ", "de"), Err(Error::Validation(_)));
        assert_matches!(client().suggest("hello", ""), Err(Error::Validation(_)));
    }

    #[test]
    fn request_body_uses_upper_case_target() {
        let body = TranslateRequest {
            text: ["ciao"],
            target_lang: "en".to_uppercase(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"text": ["ciao"], "target_lang": "EN"})
        );
    }

    #[test]
    fn first_translation_is_returned() {
        let resp: TranslateResponse = serde_json::from_str(
            r#"{"translations":[{"detected_source_language":"IT","text":"hello"},{"text":"hi"}]}"#,
        )
        .unwrap();
        assert_eq!(first_translation(resp).unwrap(), "hello");
    }

    #[test]
    fn empty_translation_list_is_a_service_error() {
        let resp: TranslateResponse = serde_json::from_str(r#"{"translations":[]}"#).unwrap();
        assert_matches!(first_translation(resp), Err(Error::Service(_)));
    }
}
