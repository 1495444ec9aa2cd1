use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use crate::indexer::{Indexer, IndexerCaps, IndexerOutcome};
use crate::metafile::Metafile;

use super::types::{classify_status, QueryPlan, TorznabError, TorznabItem};

/// Thin `reqwest` wrapper around the Torznab wire protocol (spec §4.E).
/// Parses RSS/Torznab XML with `quick-xml`; never hand-rolls HTML-entity or
/// regex-based tag extraction.
pub struct TorznabClient {
    client: Client,
    search_timeout: Duration,
    snatch_timeout: Duration,
    user_agent: String,
}

impl TorznabClient {
    pub fn new(search_timeout: Duration, snatch_timeout: Duration) -> Self {
        TorznabClient {
            client: Client::new(),
            search_timeout,
            snatch_timeout,
            user_agent: "xseed/1.0".to_string(),
        }
    }

    /// Issues a `t=caps` query and classifies the HTTP response for the
    /// indexer registry's test-connection operation (spec §4.C).
    pub async fn test_connection(&self, indexer: &Indexer) -> IndexerOutcome {
        let url = format!(
            "{}?apikey={}&t=caps",
            indexer.url.trim_end_matches('/'),
            urlencoding::encode(&indexer.apikey)
        );
        match self
            .client
            .get(&url)
            .timeout(self.search_timeout)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
        {
            Ok(resp) => classify_status(resp.status().as_u16()),
            Err(e) if e.is_timeout() => IndexerOutcome::Transient,
            Err(_) => IndexerOutcome::Transient,
        }
    }

    /// Issues a `t=caps` query and parses the response into the
    /// capabilities an indexer registration persists (spec §4.C), so that
    /// query planning can gate on what the indexer actually supports
    /// instead of defaulting every capability closed.
    pub async fn fetch_caps(&self, indexer: &Indexer) -> Result<IndexerCaps, TorznabError> {
        let url = format!(
            "{}?apikey={}&t=caps",
            indexer.url.trim_end_matches('/'),
            urlencoding::encode(&indexer.apikey)
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.search_timeout)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorznabError::Timeout
                } else {
                    TorznabError::Request(e.to_string())
                }
            })?;

        match classify_status(response.status().as_u16()) {
            IndexerOutcome::AuthFailed => return Err(TorznabError::InvalidAuth),
            IndexerOutcome::RateLimited => return Err(TorznabError::RateLimited),
            _ => {}
        }

        let body = response.text().await.map_err(|e| TorznabError::Request(e.to_string()))?;
        parse_caps(&body)
    }

    /// Executes a query plan against `indexer` and parses the Torznab RSS
    /// response.
    pub async fn search(
        &self,
        indexer: &Indexer,
        plan: &QueryPlan,
    ) -> Result<Vec<TorznabItem>, TorznabError> {
        let mut url = format!(
            "{}?apikey={}&t={}&q={}",
            indexer.url.trim_end_matches('/'),
            urlencoding::encode(&indexer.apikey),
            plan.kind.as_param(),
            urlencoding::encode(&plan.terms),
        );
        if let Some(season) = plan.season {
            url.push_str(&format!("&season={}", season));
        }
        if let Some(episode) = plan.episode {
            url.push_str(&format!("&ep={}", episode));
        }

        let response = self
            .client
            .get(&url)
            .timeout(self.search_timeout)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorznabError::Timeout
                } else {
                    TorznabError::Request(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        match classify_status(status) {
            IndexerOutcome::AuthFailed => return Err(TorznabError::InvalidAuth),
            IndexerOutcome::RateLimited => return Err(TorznabError::RateLimited),
            IndexerOutcome::Transient if status < 200 || status >= 300 => {
                return Err(TorznabError::Request(format!("HTTP {}", status)))
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| TorznabError::Request(e.to_string()))?;

        parse_rss(&body)
    }

    /// Fetches the torrent bytes for a candidate's download link
    /// (spec §4.E "Snatching"). A response that does not parse as a valid
    /// bencoded metafile is treated as `NoDownloadLink`.
    pub async fn snatch(&self, link: &str) -> Result<Vec<u8>, TorznabError> {
        let response = self
            .client
            .get(link)
            .timeout(self.snatch_timeout)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorznabError::Timeout
                } else {
                    TorznabError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TorznabError::NoDownloadLink);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TorznabError::Request(e.to_string()))?
            .to_vec();

        if Metafile::parse(&bytes).is_err() {
            return Err(TorznabError::NoDownloadLink);
        }

        Ok(bytes)
    }
}

/// Parses a Torznab RSS response into its items, reading `torznab:attr`
/// extensions for size/infohash/category.
fn parse_rss(xml: &str) -> Result<Vec<TorznabItem>, TorznabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut in_item = false;
    let mut current_tag: Vec<u8> = Vec::new();
    let mut title = String::new();
    let mut guid = String::new();
    let mut link = String::new();
    let mut pub_date_raw = String::new();
    let mut size: u64 = 0;
    let mut info_hash: Option<String> = None;
    let mut categories: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(TorznabError::InvalidXml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"item" {
                    in_item = true;
                    title.clear();
                    guid.clear();
                    link.clear();
                    pub_date_raw.clear();
                    size = 0;
                    info_hash = None;
                    categories.clear();
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) if in_item => {
                let local = e.name();
                let local = local.as_ref();
                if local == b"torznab:attr" || local.ends_with(b":attr") {
                    let mut attr_name = String::new();
                    let mut attr_value = String::new();
                    for attr in e.attributes().flatten() {
                        let key = attr.key.as_ref().to_vec();
                        let value = attr.unescape_value().unwrap_or_default().into_owned();
                        if key == b"name" {
                            attr_name = value;
                        } else if key == b"value" {
                            attr_value = value;
                        }
                    }
                    match attr_name.as_str() {
                        "size" => size = attr_value.parse().unwrap_or(size),
                        "infohash" => info_hash = Some(attr_value.to_ascii_lowercase()),
                        "category" => categories.push(attr_value),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(e)) if in_item => {
                let text = e.unescape().unwrap_or_default().into_owned();
                match current_tag.as_slice() {
                    b"title" => title.push_str(&text),
                    b"guid" => guid.push_str(&text),
                    b"link" | b"enclosure" => link.push_str(&text),
                    b"pubDate" => pub_date_raw.push_str(&text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    in_item = false;
                    let pub_date = parse_rss_date(&pub_date_raw);
                    items.push(TorznabItem {
                        title: std::mem::take(&mut title),
                        guid: if guid.is_empty() { link.clone() } else { std::mem::take(&mut guid) },
                        link: std::mem::take(&mut link),
                        size,
                        pub_date,
                        info_hash: info_hash.take(),
                        categories: std::mem::take(&mut categories),
                    });
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

/// Parses a Torznab `<caps>` response's `<searching>` and `<categories>`
/// blocks into the capability set persisted on the indexer row.
fn parse_caps(xml: &str) -> Result<IndexerCaps, TorznabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;

    let mut caps = IndexerCaps::default();
    let mut in_searching = false;
    let mut in_categories = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(TorznabError::InvalidXml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"searching" => in_searching = true,
                b"categories" => in_categories = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"searching" => in_searching = false,
                b"categories" => in_categories = false,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_searching || in_categories => {
                apply_caps_element(&e, in_searching, in_categories, &mut caps);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"limits" => {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref().to_vec();
                    let value = attr.unescape_value().unwrap_or_default().into_owned();
                    match key.as_slice() {
                        b"max" => caps.limits_max = value.parse().unwrap_or(caps.limits_max),
                        b"default" => caps.limits_default = value.parse().unwrap_or(caps.limits_default),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(caps)
}

fn apply_caps_element(
    e: &quick_xml::events::BytesStart,
    in_searching: bool,
    in_categories: bool,
    caps: &mut IndexerCaps,
) {
    let attrs: Vec<(String, String)> = e
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a.unescape_value().unwrap_or_default().into_owned();
            (key, value)
        })
        .collect();
    let available = |attrs: &[(String, String)]| {
        attrs.iter().any(|(k, v)| k == "available" && v == "yes")
    };

    if in_searching {
        match e.name().as_ref() {
            b"search" => caps.search = available(&attrs),
            b"tv-search" => {
                caps.tv = available(&attrs);
                if caps.tv {
                    add_supported_params(&attrs, caps);
                }
            }
            b"movie-search" => {
                caps.movie = available(&attrs);
                if caps.movie {
                    add_supported_params(&attrs, caps);
                }
            }
            b"music-search" => caps.music = available(&attrs),
            b"audio-search" => caps.audio = available(&attrs),
            b"book-search" => caps.book = available(&attrs),
            _ => {}
        }
    }

    if in_categories && (e.name().as_ref() == b"category" || e.name().as_ref() == b"subcat") {
        if let Some((_, id)) = attrs.iter().find(|(k, _)| k == "id") {
            caps.cat_caps.push(id.clone());
        }
    }
}

fn add_supported_params(attrs: &[(String, String)], caps: &mut IndexerCaps) {
    if let Some((_, params)) = attrs.iter().find(|(k, _)| k == "supportedParams") {
        for p in params.split(',') {
            let p = p.trim();
            if matches!(p, "q" | "season" | "ep") {
                continue;
            }
            if !p.is_empty() && !caps.id_caps.iter().any(|existing| existing == p) {
                caps.id_caps.push(p.to_string());
            }
        }
    }
}

fn parse_rss_date(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torznab="http://torznab.com/schemas/2015/feed">
<channel>
<item>
<title>Show.Name.S01E01.1080p.WEB-DL</title>
<guid>https://indexer.test/details/abc123</guid>
<link>https://indexer.test/download/abc123</link>
<pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
<torznab:attr name="size" value="1073741824" />
<torznab:attr name="infohash" value="AABBCCDDEEFF00112233445566778899AABBCCDD" />
<torznab:attr name="category" value="5000" />
<torznab:attr name="category" value="5040" />
</item>
<item>
<title>Other.Show.S02E02</title>
<guid>guid-2</guid>
<link>https://indexer.test/download/def456</link>
<pubDate>Tue, 02 Jan 2024 00:00:00 +0000</pubDate>
<torznab:attr name="size" value="500000000" />
</item>
</channel>
</rss>"#;

    #[test]
    fn parses_items_and_torznab_attrs() {
        let items = parse_rss(SAMPLE_RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Show.Name.S01E01.1080p.WEB-DL");
        assert_eq!(items[0].size, 1_073_741_824);
        assert_eq!(items[0].info_hash.as_deref(), Some("aabbccddeeff00112233445566778899aabbccdd"));
        assert_eq!(items[0].categories, vec!["5000", "5040"]);
        assert!(items[0].pub_date.is_some());

        assert_eq!(items[1].size, 500_000_000);
        assert!(items[1].info_hash.is_none());
    }

    #[test]
    fn empty_channel_yields_no_items() {
        let xml = r#"<rss><channel></channel></rss>"#;
        let items = parse_rss(xml).unwrap();
        assert!(items.is_empty());
    }

    const SAMPLE_CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<caps>
<searching>
<search available="yes" supportedParams="q"/>
<tv-search available="yes" supportedParams="q,season,ep,tvdbid,rid"/>
<movie-search available="yes" supportedParams="q,imdbid"/>
<music-search available="no"/>
<book-search available="no"/>
</searching>
<categories>
<category id="5000" name="TV">
<subcat id="5040" name="TV/HD"/>
</category>
<category id="2000" name="Movies"/>
</categories>
<limits max="100" default="50"/>
</caps>"#;

    #[test]
    fn parses_searching_and_category_caps() {
        let caps = parse_caps(SAMPLE_CAPS).unwrap();
        assert!(caps.search);
        assert!(caps.tv);
        assert!(caps.movie);
        assert!(!caps.music);
        assert!(!caps.audio);
        assert!(!caps.book);
        assert_eq!(caps.cat_caps, vec!["5000", "5040", "2000"]);
        assert!(caps.id_caps.contains(&"tvdbid".to_string()));
        assert!(caps.id_caps.contains(&"rid".to_string()));
        assert!(caps.id_caps.contains(&"imdbid".to_string()));
        assert_eq!(caps.limits_max, 100);
        assert_eq!(caps.limits_default, 50);
    }

    #[test]
    fn caps_with_no_searching_block_defaults_closed() {
        let caps = parse_caps("<caps></caps>").unwrap();
        assert!(!caps.search);
        assert!(!caps.tv);
        assert!(caps.cat_caps.is_empty());
    }
}
