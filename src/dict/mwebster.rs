/// Merriam-Webster Collegiate Dictionary JSON API.
use serde_json::Value;
use tracing::debug;

use super::markup::{Style, encode_line};
use super::{Dict, DictError, Endpoint, WordDefine, WordItem, check_auth, http_client, segment_url};
use crate::config::DictConfig;

pub const HOST: &str = "https://www.dictionaryapi.com/api/v3/references/collegiate/json";

pub struct DictMWebster {
    client: reqwest::blocking::Client,
    host: String,
    api_key: String,
}

impl DictMWebster {
    pub fn new(config: &DictConfig) -> Result<Self, DictError> {
        if config.mwebster.api_key.trim().is_empty() {
            return Err(DictError::MissingCredential {
                endpoint: Endpoint::MWebster,
                key: "dict.mwebster.api_key",
            });
        }
        Ok(Self {
            client: http_client(Endpoint::MWebster, config)?,
            host: HOST.to_string(),
            api_key: config.mwebster.api_key.clone(),
        })
    }
}

pub fn factory(config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(DictMWebster::new(config)?))
}

impl Dict for DictMWebster {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        let url = segment_url(Endpoint::MWebster, &self.host, &[word])?;
        debug!("mwebster lookup: {word}");

        let resp = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(DictError::transport(Endpoint::MWebster))?;
        check_auth(Endpoint::MWebster, &resp)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DictError::unexpected(
                Endpoint::MWebster,
                format!("status {status}"),
            ));
        }

        let body = resp
            .text()
            .map_err(DictError::transport(Endpoint::MWebster))?;
        // A bad key still answers 200, with a plain-text body.
        if body.trim_start().starts_with("Invalid API key") {
            return Err(DictError::Unauthorized {
                endpoint: Endpoint::MWebster,
                status: status.as_u16(),
            });
        }
        parse_response(word, &body)
    }
}

fn entry_define(entry: &Value) -> Option<WordDefine> {
    let headword = entry["hwi"]["hw"].as_str()?.replace('*', "");
    let shortdefs: Vec<&str> = entry["shortdef"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    if shortdefs.is_empty() {
        return None;
    }

    let heading = match entry["fl"].as_str() {
        Some(fl) => format!("{headword} ({fl})"),
        None => headword,
    };
    let mut lines = vec![encode_line(Style::Highlight, &heading)];
    lines.extend(
        shortdefs
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {d}", i + 1)),
    );

    let phonetics = entry["hwi"]["prs"]
        .as_array()
        .map(|prs| {
            prs.iter()
                .filter_map(|p| p["mw"].as_str())
                .map(|mw| format!("\\{mw}\\"))
                .collect()
        })
        .unwrap_or_default();

    Some(WordDefine {
        phonetics,
        definition: lines.join("\n"),
    })
}

/// Parse a collegiate API body.
///
/// An array of strings is the API's "did you mean" answer and counts as
/// not found.
pub fn parse_response(word: &str, body: &str) -> Result<WordItem, DictError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| DictError::unexpected(Endpoint::MWebster, format!("invalid JSON: {e}")))?;
    let entries = value
        .as_array()
        .ok_or_else(|| DictError::unexpected(Endpoint::MWebster, "expected a JSON array"))?;

    let defines = entries
        .iter()
        .filter(|e| e.is_object())
        .filter_map(entry_define)
        .collect();
    Ok(WordItem::new(word, defines))
}
