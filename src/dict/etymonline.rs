/// Online Etymology Dictionary (HTML scraping).
///
/// Entry headwords are emitted as highlight lines and quoted source
/// paragraphs (`<blockquote>`) as quote lines.
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::markup::{Style, encode_line};
use super::{Dict, DictError, Endpoint, WordDefine, WordItem, check_auth, http_client, segment_url};
use crate::config::DictConfig;

pub const HOST: &str = "https://www.etymonline.com";

static ENTRIES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div.ant-col-xs-24 > [class^="word--"]"#).unwrap());
static HEADWORD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class^="word__name--"]"#).unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("section > *").unwrap());

pub struct DictEtymonline {
    client: reqwest::blocking::Client,
    host: String,
}

impl DictEtymonline {
    pub fn new(config: &DictConfig) -> Result<Self, DictError> {
        Ok(Self {
            client: http_client(Endpoint::Etymonline, config)?,
            host: HOST.to_string(),
        })
    }
}

pub fn factory(config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(DictEtymonline::new(config)?))
}

impl Dict for DictEtymonline {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        let url = segment_url(Endpoint::Etymonline, &self.host, &["word", word])?;
        debug!("etymonline lookup: {word}");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(DictError::transport(Endpoint::Etymonline))?;
        check_auth(Endpoint::Etymonline, &resp)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(WordItem::not_found(word));
        }
        if !resp.status().is_success() {
            return Err(DictError::unexpected(
                Endpoint::Etymonline,
                format!("status {}", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(DictError::transport(Endpoint::Etymonline))?;
        Ok(parse_page(word, &body))
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Extract one definition per etymology entry on a word page.
pub fn parse_page(word: &str, html: &str) -> WordItem {
    let doc = Html::parse_document(html);
    let mut defines = Vec::new();

    for entry in doc.select(&ENTRIES) {
        let mut lines = Vec::new();

        if let Some(name) = entry.select(&HEADWORD).next() {
            lines.push(encode_line(Style::Highlight, &element_text(name)));
        }

        for para in entry.select(&PARAGRAPHS) {
            let text = element_text(para);
            if text.is_empty() {
                continue;
            }
            let style = if para.value().name() == "blockquote" {
                Style::Quote
            } else {
                Style::Plain
            };
            lines.push(encode_line(style, &text));
        }

        if !lines.is_empty() {
            defines.push(WordDefine {
                phonetics: Vec::new(),
                definition: lines.join("\n"),
            });
        }
    }

    WordItem::new(word, defines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::markup::{self, Style};

    const PAGE: &str = r#"
<html><body>
<div class="ant-row">
<div class="ant-col-xs-24">
  <div class="word--C9UPa">
    <div><div><h1 class="word__name--TTbAA" title="Origin of bing">bing (n.)</h1></div></div>
    <section class="word__defination--2q7ZH">
      <p>"heap or pile," 1510s, from Old Norse.</p>
      <blockquote>Bing, a heape of corne.</blockquote>
      <p></p>
    </section>
  </div>
  <div class="word--C9UPa">
    <div><div><h1 class="word__name--TTbAA">bing (v.)</h1></div></div>
    <section><p>"to go," 1560s, cant.</p></section>
  </div>
  <div class="related--x">Entries linking to bing</div>
</div>
</div>
</body></html>
"#;

    #[test]
    fn test_parse_entries() {
        let item = parse_page("bing", PAGE);
        assert_eq!(item.defines.len(), 2);
        assert_eq!(
            item.defines[0].definition,
            "++++bing (n.)\n\"heap or pile,\" 1510s, from Old Norse.\n----Bing, a heape of corne."
        );

        let styles: Vec<Style> = markup::decode(&item.defines[0].definition)
            .iter()
            .map(|l| l.style)
            .collect();
        assert_eq!(styles, vec![Style::Highlight, Style::Plain, Style::Quote]);

        assert_eq!(item.defines[1].definition, "++++bing (v.)\n\"to go,\" 1560s, cant.");
    }

    #[test]
    fn test_search_keeps_word_opaque() {
        let (base, server) = crate::dict::serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let dict = DictEtymonline {
            client: http_client(Endpoint::Etymonline, &DictConfig::default()).unwrap(),
            host: base,
        };

        let item = dict.search("c#").unwrap();
        assert_eq!(server.join().unwrap(), "GET /word/c%23 HTTP/1.1");
        assert_eq!(item.word, "c#");
        assert!(!item.is_found());
    }

    #[test]
    fn test_parse_empty_page() {
        let item = parse_page("qwxzv", "<html><body></body></html>");
        assert!(item.defines.is_empty());
    }
}
