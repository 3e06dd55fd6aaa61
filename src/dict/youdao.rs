/// Youdao web dictionary (HTML scraping).
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Dict, DictError, Endpoint, WordDefine, WordItem, check_auth, http_client, tidy_lines};
use crate::config::DictConfig;

pub const HOST: &str = "https://dict.youdao.com";

static KEYWORD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.keyword").unwrap());
static TRANS_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#phrsListTab > div.trans-container > ul > li").unwrap());
static EN_PHONETIC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#phrsListTab > h2 > div > span:nth-child(1)").unwrap());
static US_PHONETIC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#phrsListTab > h2 > div > span:nth-child(2)").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub struct DictYoudao {
    client: reqwest::blocking::Client,
    host: String,
}

impl DictYoudao {
    pub fn new(config: &DictConfig) -> Result<Self, DictError> {
        Ok(Self {
            client: http_client(Endpoint::Youdao, config)?,
            host: HOST.to_string(),
        })
    }
}

pub fn factory(config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(DictYoudao::new(config)?))
}

impl Dict for DictYoudao {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        let url = format!("{}/search", self.host);
        debug!("youdao lookup: {word}");

        let resp = self
            .client
            .get(&url)
            .query(&[("q", word)])
            .send()
            .map_err(DictError::transport(Endpoint::Youdao))?;
        check_auth(Endpoint::Youdao, &resp)?;
        if !resp.status().is_success() {
            return Err(DictError::unexpected(
                Endpoint::Youdao,
                format!("status {}", resp.status()),
            ));
        }

        let body = resp.text().map_err(DictError::transport(Endpoint::Youdao))?;
        Ok(parse_page(word, &body))
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn first_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Extract the definition block from a Youdao search page.
pub fn parse_page(word: &str, html: &str) -> WordItem {
    let doc = Html::parse_document(html);

    if first_text(&doc, &KEYWORD).trim().is_empty() {
        return WordItem::not_found(word);
    }

    let definition = doc
        .select(&TRANS_ITEMS)
        .map(|li| tidy_lines(&element_text(li), " "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let phonetics = [&*EN_PHONETIC, &*US_PHONETIC]
        .into_iter()
        .map(|sel| SPACES.replace_all(first_text(&doc, sel).trim(), " ").into_owned())
        .filter(|p| !p.is_empty())
        .collect();

    WordItem::new(
        word,
        vec![WordDefine {
            phonetics,
            definition,
        }],
    )
}
