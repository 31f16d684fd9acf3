use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{api_key, ensure_success, http_client, ANTHROPIC_KEY_VAR};
use crate::config::Config;
use crate::error::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "You are the image analyzer. Your task is to identify underlined \
phrases in the text in the uploaded picture. The phrase is underlined only when the line is \
exactly under the phrase. The specific word should appear in the phrase only if it is \
explicitly underlined.";

const USER_PROMPT: &str = "Please examine the image and list all phrases that are underlined. \
For each underlined phrase you identify: 1/ Write out the phrase exactly as it appears. \
2/ Provide a brief snippet of the surrounding text for context. 3/ List the phrases in the \
order they appear in the image, from the top to the bottom in JSON format \
(example [{\"phrase\":\"xxx\",\"context\":\"yyy\"}]). Return only JSON.";

/// A phrase marked in a photographed page, with the text around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderlinedPhrase {
    pub phrase: String,
    #[serde(default)]
    pub context: String,
}

/// Reads underlined phrases out of a page image
pub trait UnderlineExtractor {
    fn extract(&self, image: &[u8], media_type: &str) -> Result<Vec<UnderlinedPhrase>>;
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicExtractor {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
}

impl AnthropicExtractor {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.anthropic_api_url.clone(),
            api_key(ANTHROPIC_KEY_VAR)?,
            config.extraction_model.clone(),
            config.request_timeout_secs,
        )
    }

    fn request_body(&self, image: &[u8], media_type: &str) -> serde_json::Value {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {"type": "base64", "media_type": media_type, "data": data},
                    },
                    {"type": "text", "text": USER_PROMPT},
                ],
            }],
        })
    }
}

impl UnderlineExtractor for AnthropicExtractor {
    fn extract(&self, image: &[u8], media_type: &str) -> Result<Vec<UnderlinedPhrase>> {
        if image.is_empty() {
            return Err(Error::validation("No image to read."));
        }

        log::debug!("sending {} byte {media_type} image to {}", image.len(), self.url);
        let resp = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(image, media_type))
            .send()?;
        let message: MessageResponse = ensure_success("Anthropic", resp)?.json()?;

        let reply = message
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| Error::Service("extraction returned no text".to_string()))?;
        parse_underlined(&reply)
    }
}

/// Media type for an image file, judged by its extension
pub fn media_type_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(Error::validation(format!(
            "Unsupported image type: {}",
            path.display()
        ))),
    }
}

/// Pull the JSON array out of a model reply. Code fences and any prose
/// around the array are ignored, including prose with brackets of its own:
/// every `[` is tried in turn until one opens an array of phrases.
pub fn parse_underlined(reply: &str) -> Result<Vec<UnderlinedPhrase>> {
    let candidates: Vec<usize> = reply
        .match_indices('[')
        .map(|(idx, _)| idx)
        .filter(|idx| reply[*idx..].contains(']'))
        .collect();
    if candidates.is_empty() {
        return Err(Error::Service(
            "extraction reply contained no JSON array".to_string(),
        ));
    }

    let mut first_error = None;
    let mut empty_array = None;
    for start in candidates {
        let mut stream =
            serde_json::Deserializer::from_str(&reply[start..]).into_iter::<Vec<UnderlinedPhrase>>();
        match stream.next() {
            Some(Ok(phrases)) if phrases.is_empty() => {
                empty_array.get_or_insert(phrases);
            }
            Some(Ok(phrases)) => return Ok(clean_phrases(phrases)),
            Some(Err(e)) => {
                log::debug!("no phrase array at offset {start}: {e}");
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    match (empty_array, first_error) {
        (Some(phrases), _) => Ok(phrases),
        (None, Some(e)) => Err(e.into()),
        (None, None) => Err(Error::Service(
            "extraction reply contained no JSON array".to_string(),
        )),
    }
}

fn clean_phrases(phrases: Vec<UnderlinedPhrase>) -> Vec<UnderlinedPhrase> {
    phrases
        .into_iter()
        .map(|p| UnderlinedPhrase {
            phrase: p.phrase.trim().to_string(),
            context: p.context.trim().to_string(),
        })
        .filter(|p| !p.phrase.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_bare_array() {
        let phrases =
            parse_underlined(r#"[{"phrase":"in bocca al lupo","context":"ti dico in bocca al lupo!"}]"#)
                .unwrap();
        assert_eq!(
            phrases,
            vec![UnderlinedPhrase {
                phrase: "in bocca al lupo".into(),
                context: "ti dico in bocca al lupo!".into(),
            }]
        );
    }

    #[test]
    fn tolerates_fences_and_prose() {
        let reply = "Here is what I found:\n```json\n[\n  {\"phrase\": \" Feierabend \", \"context\": \"nach dem Feierabend\"},\n  {\"phrase\": \"\"},\n  {\"phrase\": \"Tschüss\"}\n]\n```\nLet me know!";
        let phrases = parse_underlined(reply).unwrap();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].phrase, "Feierabend");
        assert_eq!(phrases[1].context, "");
    }

    #[test]
    fn bracketed_prose_before_the_array_is_skipped() {
        let reply = "I found [2] phrases:\n[{\"phrase\":\"ciao\",\"context\":\"ciao bella\"},{\"phrase\":\"grazie\"}]";
        let phrases = parse_underlined(reply).unwrap();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].phrase, "ciao");
        assert_eq!(phrases[0].context, "ciao bella");
    }

    #[test]
    fn empty_array_is_no_phrases() {
        assert_eq!(parse_underlined("Nothing underlined: []").unwrap(), vec![]);
    }

    #[test]
    fn reply_without_array_is_a_service_error() {
        assert_matches!(
            parse_underlined("I could not find any underlined text."),
            Err(Error::Service(_))
        );
        assert_matches!(parse_underlined("] nothing ["), Err(Error::Service(_)));
        assert_matches!(parse_underlined("[not json]"), Err(Error::Json(_)));
    }

    #[test]
    fn request_carries_base64_image() {
        let extractor =
            AnthropicExtractor::new("http://127.0.0.1:9/messages", "key", "test-model", 1).unwrap();
        let body = extractor.request_body(b"abc", "image/png");
        assert_eq!(body["model"], "test-model");
        let image = &body["messages"][0]["content"][0];
        assert_eq!(image["source"]["media_type"], "image/png");
        assert_eq!(image["source"]["data"], "YWJj");
        assert_eq!(body["messages"][0]["content"][1]["type"], "text");
    }

    #[test]
    fn empty_image_is_rejected() {
        let extractor =
            AnthropicExtractor::new("http://127.0.0.1:9/messages", "key", "m", 1).unwrap();
        assert_matches!(extractor.extract(&[], "image/png"), Err(Error::Validation(_)));
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for(Path::new("page.JPG")).unwrap(), "image/jpeg");
        assert_eq!(media_type_for(Path::new("a/b.png")).unwrap(), "image/png");
        assert_matches!(media_type_for(Path::new("notes.txt")), Err(Error::Validation(_)));
        assert_matches!(media_type_for(Path::new("noext")), Err(Error::Validation(_)));
    }
}
