// src/fetch/urls.rs
use std::io::{Read, Write};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::fetch::RemoteIndex;

/// File names of downloadable year archives, e.g. `datagis-12-2021.zip`.
static ARCHIVE_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\.zip$").expect("valid archive href regex"));

const CHUNK_SIZE: usize = 8 * 1024;

/// Pull every anchor href pointing at a year archive out of an index page,
/// in document order, duplicates included.
pub fn extract_archive_hrefs(html: &str) -> Vec<String> {
    let selector = Selector::parse("a[href]").expect("valid CSS selector for anchors");
    Html::parse_document(html)
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .filter(|href| ARCHIVE_HREF_RE.is_match(href))
        .map(str::to_string)
        .collect()
}

/// The production archive index: one HTML page whose anchor table enumerates
/// every downloadable year archive.
pub struct HttpIndex {
    client: Client,
    url: Url,
}

impl HttpIndex {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ScrapeError::InvalidArgument(format!("index url {url:?}: {e}")))?;
        let client = Client::builder()
            .default_headers(browser_headers(url.as_str()))
            .build()
            .map_err(|source| ScrapeError::Transfer {
                url: url.to_string(),
                source,
            })?;
        Ok(HttpIndex { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl RemoteIndex for HttpIndex {
    fn list_archives(&self) -> Result<Vec<String>> {
        let transfer = |source| ScrapeError::Transfer {
            url: self.url.to_string(),
            source,
        };
        let html = self
            .client
            .get(self.url.clone())
            .send()
            .map_err(transfer)?
            .error_for_status()
            .map_err(transfer)?
            .text()
            .map_err(transfer)?;
        let hrefs = extract_archive_hrefs(&html);
        debug!(count = hrefs.len(), "listed remote archives");
        Ok(hrefs)
    }

    fn fetch(&self, href: &str, dest: &mut dyn Write) -> Result<u64> {
        let url = self
            .url
            .join(href)
            .map_err(|e| ScrapeError::InvalidArgument(format!("archive href {href:?}: {e}")))?;
        let transfer = |source| ScrapeError::Transfer {
            url: url.to_string(),
            source,
        };
        let mut resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(transfer)?
            .error_for_status()
            .map_err(transfer)?;

        // stream in fixed-size chunks rather than buffering the whole body
        let mut buf = [0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let n = resp.read(&mut buf)?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n])?;
            written += n as u64;
        }
        Ok(written)
    }
}

/// The dataset host serves an error page to clients without browser-like
/// headers, so mimic one.
fn browser_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/86.0.4240.75 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
             image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("cs-CZ,cs;q=0.9,en;q=0.8"),
    );
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_archive_hrefs_in_document_order() {
        let html = r#"
            <html><body><table>
                <tr><td><a href="data/datagis-2016.zip">2016</a></td></tr>
                <tr><td><a href="data/datagis-11-2021.zip">11/2021</a></td></tr>
                <tr><td><a href="statistics.pdf">stats</a></td></tr>
                <tr><td><a href="data/readme.txt">readme</a></td></tr>
            </table></body></html>
        "#;
        assert_eq!(
            extract_archive_hrefs(html),
            vec!["data/datagis-2016.zip", "data/datagis-11-2021.zip"]
        );
    }

    #[test]
    fn keeps_duplicates_and_ignores_non_year_zips() {
        let html = r#"
            <a href="data/2020.zip">a</a>
            <a href="data/2020.zip">b</a>
            <a href="data/other.zip">c</a>
        "#;
        assert_eq!(
            extract_archive_hrefs(html),
            vec!["data/2020.zip", "data/2020.zip"]
        );
    }

    #[test]
    fn empty_page_yields_no_hrefs() {
        assert!(extract_archive_hrefs("<html></html>").is_empty());
    }
}
