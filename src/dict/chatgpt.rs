/// LLM-backed provider speaking the OpenAI chat-completions protocol.
///
/// The model is asked to answer in the markup line format so the reply
/// can be used as a definition without further parsing.
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Dict, DictError, Endpoint, WordDefine, WordItem, check_auth, http_client};
use crate::config::DictConfig;

const NOT_FOUND_REPLY: &str = "NOT_FOUND";

const SYSTEM_PROMPT: &str = "You are an English learner's dictionary. \
For the word or phrase given by the user, reply in plain text only:\n\
- first line: the IPA pronunciation wrapped in slashes, e.g. /həˈləʊ/\n\
- then one block per part of speech: a line starting with ++++ holding the part of speech, \
followed by numbered meanings, each with a short Chinese gloss\n\
- prefix every example sentence line with ----\n\
If the input is not a real word or phrase, reply with exactly NOT_FOUND.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct DictChatGpt {
    client: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl DictChatGpt {
    pub fn new(config: &DictConfig) -> Result<Self, DictError> {
        if config.chatgpt.api_key.trim().is_empty() {
            return Err(DictError::MissingCredential {
                endpoint: Endpoint::ChatGpt,
                key: "dict.chatgpt.api_key",
            });
        }
        Ok(Self {
            client: http_client(Endpoint::ChatGpt, config)?,
            api_base: config.chatgpt.api_base.trim_end_matches('/').to_string(),
            api_key: config.chatgpt.api_key.clone(),
            model: config.chatgpt.model.clone(),
        })
    }
}

pub fn factory(config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(DictChatGpt::new(config)?))
}

impl Dict for DictChatGpt {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: word,
                },
            ],
            temperature: 0.2,
        };
        debug!("chatgpt lookup: {word} (model {})", self.model);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(DictError::transport(Endpoint::ChatGpt))?;
        check_auth(Endpoint::ChatGpt, &resp)?;
        if !resp.status().is_success() {
            return Err(DictError::unexpected(
                Endpoint::ChatGpt,
                format!("status {}", resp.status()),
            ));
        }

        let body: ChatResponse = resp
            .json()
            .map_err(DictError::transport(Endpoint::ChatGpt))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DictError::unexpected(Endpoint::ChatGpt, "no completion choices"))?;

        Ok(parse_completion(word, &content))
    }
}

/// Turn a completion into a [`WordItem`].
///
/// A leading `/.../` line becomes the phonetic; the rest is kept verbatim
/// as markup-bearing definition text.
pub fn parse_completion(word: &str, content: &str) -> WordItem {
    let content = content.trim();
    if content.is_empty() || content == NOT_FOUND_REPLY {
        return WordItem::not_found(word);
    }

    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    let first = first.trim();
    let (phonetics, definition) = if first.len() > 1 && first.starts_with('/') && first.ends_with('/') {
        (vec![first.to_string()], rest.trim().to_string())
    } else {
        (Vec::new(), content.to_string())
    };

    WordItem::new(
        word,
        vec![WordDefine {
            phonetics,
            definition,
        }],
    )
}
