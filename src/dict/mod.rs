/// Dictionary providers and the normalized lookup result they produce.
///
/// Every provider implements [`Dict`]. The active one is picked at runtime
/// from the configured [`Endpoint`] through a [`DictRegistry`].
pub mod chatgpt;
pub mod ecdict;
pub mod etymonline;
pub mod markup;
pub mod mwebster;
pub mod youdao;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DictConfig;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

// ── Model ────────────────────────────────────────────────────────────

/// One lookup result. An empty `defines` list means the word was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordItem {
    pub word: String,
    pub defines: Vec<WordDefine>,
}

/// One sense/entry of a word. `definition` may carry markup prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDefine {
    pub phonetics: Vec<String>,
    pub definition: String,
}

impl WordItem {
    /// Build an item, trimming the queried term.
    pub fn new(word: &str, defines: Vec<WordDefine>) -> Self {
        Self {
            word: word.trim().to_string(),
            defines,
        }
    }

    /// The "not found" sentinel: no definitions, no error.
    pub fn not_found(word: &str) -> Self {
        Self::new(word, Vec::new())
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        !self.defines.is_empty()
    }

    /// Colorized terminal form.
    pub fn render(&self) -> String {
        markup::render_colored(self)
    }

    /// Plain-text form with markup prefixes stripped.
    pub fn raw_string(&self) -> String {
        markup::render_raw(self)
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Errors raised while selecting or querying a provider.
///
/// "Word not found" is never an error; see [`WordItem::not_found`].
#[derive(Error, Debug)]
pub enum DictError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{endpoint}: missing credential `{key}` in config")]
    MissingCredential { endpoint: Endpoint, key: &'static str },

    #[error("{endpoint}: invalid request url {url:?}")]
    InvalidUrl { endpoint: Endpoint, url: String },

    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: authentication rejected (status {status})")]
    Unauthorized { endpoint: Endpoint, status: u16 },

    #[error("{endpoint}: unexpected response: {message}")]
    UnexpectedResponse { endpoint: Endpoint, message: String },

    #[error("{endpoint}: local dictionary error: {source}")]
    LocalStore {
        endpoint: Endpoint,
        #[source]
        source: rusqlite::Error,
    },
}

impl DictError {
    pub(crate) fn transport(endpoint: Endpoint) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { endpoint, source }
    }

    pub(crate) fn unexpected(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            endpoint,
            message: message.into(),
        }
    }
}

// ── Provider trait ───────────────────────────────────────────────────

/// A dictionary provider.
///
/// `word` is opaque display text (already trimmed and joined by the
/// caller); providers must not tokenize it further.
pub trait Dict: Send + Sync {
    fn search(&self, word: &str) -> Result<WordItem, DictError>;
}

// ── Endpoint ─────────────────────────────────────────────────────────

/// Identifier of a provider implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    Youdao,
    Etymonline,
    Ecdict,
    ChatGpt,
    MWebster,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Youdao,
        Endpoint::Etymonline,
        Endpoint::Ecdict,
        Endpoint::ChatGpt,
        Endpoint::MWebster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Youdao => "youdao",
            Endpoint::Etymonline => "etymonline",
            Endpoint::Ecdict => "ecdict",
            Endpoint::ChatGpt => "chatgpt",
            Endpoint::MWebster => "mwebster",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = DictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|e| e.as_str() == s.trim())
            .ok_or_else(|| DictError::InvalidEndpoint(s.to_string()))
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Constructor stored in the registry.
pub type DictFactory = fn(&DictConfig) -> Result<Box<dyn Dict>, DictError>;

/// Map from endpoint to provider constructor.
pub struct DictRegistry {
    factories: BTreeMap<Endpoint, DictFactory>,
}

impl DictRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Endpoint::Youdao, youdao::factory);
        registry.register(Endpoint::Etymonline, etymonline::factory);
        registry.register(Endpoint::Ecdict, ecdict::factory);
        registry.register(Endpoint::ChatGpt, chatgpt::factory);
        registry.register(Endpoint::MWebster, mwebster::factory);
        registry
    }

    /// Register (or replace) the constructor for an endpoint.
    pub fn register(&mut self, endpoint: Endpoint, factory: DictFactory) {
        self.factories.insert(endpoint, factory);
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.factories.keys().copied().collect()
    }

    /// Build the provider for `endpoint`.
    pub fn create(&self, endpoint: Endpoint, config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
        let factory = self
            .factories
            .get(&endpoint)
            .ok_or_else(|| DictError::InvalidEndpoint(endpoint.to_string()))?;
        factory(config)
    }

    /// Parse an identifier and build its provider.
    pub fn create_by_name(&self, name: &str, config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
        self.create(name.parse()?, config)
    }
}

impl Default for DictRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

/// Blocking HTTP client shared by the web providers.
pub(crate) fn http_client(
    endpoint: Endpoint,
    config: &DictConfig,
) -> Result<reqwest::blocking::Client, DictError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(DictError::transport(endpoint))
}

/// `base` with `segments` appended as percent-encoded path segments.
///
/// The word is one segment, so `#`, `?` and `/` inside it stay data.
pub(crate) fn segment_url(
    endpoint: Endpoint,
    base: &str,
    segments: &[&str],
) -> Result<reqwest::Url, DictError> {
    let invalid = || DictError::InvalidUrl {
        endpoint,
        url: base.to_string(),
    };
    let mut url = reqwest::Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map 401/403 to [`DictError::Unauthorized`].
pub(crate) fn check_auth(
    endpoint: Endpoint,
    resp: &reqwest::blocking::Response,
) -> Result<(), DictError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(DictError::Unauthorized {
            endpoint,
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Collapse each line's surrounding whitespace and drop blank lines.
pub(crate) fn tidy_lines(text: &str, sep: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}


/// One-shot local HTTP server for provider request tests.
///
/// Answers the first connection with `response` and hands back the
/// request line it received.
#[cfg(test)]
pub(crate) fn serve_once(response: &'static str) -> (String, std::thread::JoinHandle<String>) {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                break;
            }
        }
        reader.get_mut().write_all(response.as_bytes()).unwrap();
        request_line.trim_end().to_string()
    });
    (base, handle)
}
