//! rTorrent client adapter, speaking rTorrent's XML-RPC interface over
//! HTTP (typically exposed via a SCGI-to-HTTP gateway in front of
//! rTorrent itself).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use reqwest::Client;
use tracing::warn;

use super::types::{
    ClientTorrent, GetDownloadDirError, GetDownloadDirOptions, InjectOutcome, TorrentClient,
    TorrentClientError,
};
use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;

#[derive(Debug, Clone)]
pub struct RtorrentConfig {
    pub url: String,
    pub timeout_secs: u32,
}

pub struct RtorrentClient {
    client: Client,
    config: RtorrentConfig,
}

#[derive(Debug, Clone)]
enum XmlRpcValue {
    Str(String),
    Int(i64),
    Base64(Vec<u8>),
    Array(Vec<XmlRpcValue>),
}

impl XmlRpcValue {
    fn as_str(&self) -> Option<&str> {
        match self {
            XmlRpcValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_array(&self) -> Option<&[XmlRpcValue]> {
        match self {
            XmlRpcValue::Array(v) => Some(v),
            _ => None,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn encode_call(method: &str, params: &[XmlRpcValue]) -> String {
    let mut body = String::new();
    body.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName><params>");
    for p in params {
        body.push_str("<param><value>");
        encode_value(p, &mut body);
        body.push_str("</value></param>");
    }
    body.push_str("</params></methodCall>");
    body
}

fn encode_value(value: &XmlRpcValue, out: &mut String) {
    match value {
        XmlRpcValue::Str(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s));
            out.push_str("</string>");
        }
        XmlRpcValue::Int(n) => {
            out.push_str(&format!("<i8>{}</i8>", n));
        }
        XmlRpcValue::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        XmlRpcValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                out.push_str("<value>");
                encode_value(item, out);
                out.push_str("</value>");
            }
            out.push_str("</data></array>");
        }
    }
}

/// Parses the first top-level `<value>` found in a `methodResponse` body.
/// rTorrent's multicall responses are nested arrays of strings; that is
/// the only shape this parser needs to handle.
fn parse_response(xml: &str) -> Result<XmlRpcValue, TorrentClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;

    parse_next_value(&mut reader)
        .ok_or_else(|| TorrentClientError::ApiError("empty or malformed xmlrpc response".to_string()))
}

fn parse_next_value(reader: &mut Reader<&[u8]>) -> Option<XmlRpcValue> {
    loop {
        match reader.read_event().ok()? {
            Event::Start(tag) => {
                let name = tag_name(&tag);
                match name.as_str() {
                    "value" => return parse_next_value(reader),
                    "array" => return Some(parse_array(reader)),
                    "string" | "i4" | "i8" | "int" | "base64" => {
                        return Some(parse_scalar(reader, &name));
                    }
                    _ => continue,
                }
            }
            Event::Eof => return None,
            _ => continue,
        }
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> XmlRpcValue {
    let mut items = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag_name(&tag) == "value" => {
                if let Some(v) = parse_next_value_from_open_value(reader) {
                    items.push(v);
                }
            }
            Ok(Event::End(tag)) if tag_name_end(&tag) == "array" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => continue,
        }
    }
    XmlRpcValue::Array(items)
}

fn parse_next_value_from_open_value(reader: &mut Reader<&[u8]>) -> Option<XmlRpcValue> {
    match reader.read_event().ok()? {
        Event::Start(tag) => {
            let name = tag_name(&tag);
            match name.as_str() {
                "array" => Some(parse_array(reader)),
                "string" | "i4" | "i8" | "int" | "base64" => Some(parse_scalar(reader, &name)),
                _ => None,
            }
        }
        Event::Text(text) => Some(XmlRpcValue::Str(decode_text(&text))),
        _ => None,
    }
}

fn parse_scalar(reader: &mut Reader<&[u8]>, tag: &str) -> XmlRpcValue {
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => text.push_str(&decode_text(&t)),
            Ok(Event::End(_)) | Ok(Event::Eof) | Err(_) => break,
            _ => continue,
        }
    }
    match tag {
        "i4" | "i8" | "int" => XmlRpcValue::Int(text.trim().parse().unwrap_or(0)),
        "base64" => XmlRpcValue::Base64(
            base64::engine::general_purpose::STANDARD.decode(text.trim()).unwrap_or_default(),
        ),
        _ => XmlRpcValue::Str(text),
    }
}

fn decode_text(text: &BytesText) -> String {
    text.unescape().map(|s| s.into_owned()).unwrap_or_default()
}

fn tag_name(tag: &BytesStart) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

fn tag_name_end(tag: &quick_xml::events::BytesEnd) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

impl RtorrentClient {
    pub fn new(config: RtorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("failed to build rtorrent http client");
        Self { client, config }
    }

    async fn call(&self, method: &str, params: &[XmlRpcValue]) -> Result<XmlRpcValue, TorrentClientError> {
        let body = encode_call(method, params);

        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else {
                    TorrentClientError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }

        let text = response.text().await.map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        parse_response(&text)
    }

    /// `d.multicall2` row: hash, completion flag, base directory, custom1
    /// (used here to store a category), tracker announce url.
    async fn multicall(&self, hash_filter: &str) -> Result<Vec<Vec<XmlRpcValue>>, TorrentClientError> {
        let params = vec![
            XmlRpcValue::Str(String::new()),
            XmlRpcValue::Str(hash_filter.to_string()),
            XmlRpcValue::Str("d.hash=".to_string()),
            XmlRpcValue::Str("d.complete=".to_string()),
            XmlRpcValue::Str("d.directory=".to_string()),
            XmlRpcValue::Str("d.custom1=".to_string()),
            XmlRpcValue::Str("t.multicall=,t.url=".to_string()),
        ];
        let result = self.call("d.multicall2", &params).await?;
        let rows = result
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.as_array().map(|fields| fields.to_vec()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

#[async_trait]
impl TorrentClient for RtorrentClient {
    fn name(&self) -> &str {
        "rtorrent"
    }

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError> {
        let rows = self.multicall("").await?;
        let hash = info_hash.to_ascii_uppercase();
        Ok(rows
            .iter()
            .find(|row| row.first().and_then(XmlRpcValue::as_str) == Some(hash.as_str()))
            .and_then(|row| row.get(1))
            .and_then(|v| if let XmlRpcValue::Int(n) = v { Some(*n) } else { None })
            .is_some_and(|complete| complete == 1))
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let rows = self.multicall("").await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let hash = row.first().and_then(XmlRpcValue::as_str).unwrap_or_default().to_ascii_lowercase();
                let category = row
                    .get(3)
                    .and_then(XmlRpcValue::as_str)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string());
                let trackers = row
                    .get(4)
                    .and_then(XmlRpcValue::as_array)
                    .map(|urls| urls.iter().filter_map(XmlRpcValue::as_str).map(|u| vec![u.to_string()]).collect())
                    .unwrap_or_default();

                ClientTorrent { info_hash: hash, category: category.clone(), tags: category.into_iter().collect(), trackers }
            })
            .collect())
    }

    async fn get_download_dir(
        &self,
        meta: &Metafile,
        opts: GetDownloadDirOptions,
    ) -> Result<PathBuf, GetDownloadDirError> {
        let rows = self
            .multicall("")
            .await
            .map_err(|e| GetDownloadDirError::UnknownError(e.to_string()))?;

        let hash = meta.info_hash.to_ascii_uppercase();
        let row = rows
            .into_iter()
            .find(|row| row.first().and_then(XmlRpcValue::as_str) == Some(hash.as_str()))
            .ok_or(GetDownloadDirError::NotFound)?;

        let complete = row.get(1).and_then(|v| if let XmlRpcValue::Int(n) = v { Some(*n) } else { None }).unwrap_or(0);
        if opts.only_completed && complete != 1 {
            return Err(GetDownloadDirError::TorrentNotComplete);
        }

        let directory = row.get(2).and_then(XmlRpcValue::as_str).unwrap_or_default();
        Ok(PathBuf::from(directory))
    }

    async fn inject(
        &self,
        meta: &Metafile,
        searchee: &Searchee,
        _decision: &Decision,
        path: Option<&Path>,
    ) -> Result<InjectOutcome, TorrentClientError> {
        if self.is_torrent_complete(&meta.info_hash).await.is_ok() {
            let rows = self.multicall("").await?;
            let hash = meta.info_hash.to_ascii_uppercase();
            if rows.iter().any(|row| row.first().and_then(XmlRpcValue::as_str) == Some(hash.as_str())) {
                return Ok(InjectOutcome::AlreadyExists);
            }
        }

        let download_dir = path.map(|p| p.to_string_lossy().into_owned()).or_else(|| {
            if let crate::searchee::SearcheeOrigin::Client { save_path, .. } = &searchee.origin {
                Some(save_path.clone())
            } else {
                None
            }
        });

        let method = if download_dir.is_some() { "load.raw_start" } else { "load.raw" };
        let mut params = vec![XmlRpcValue::Str(String::new()), XmlRpcValue::Base64(meta.bytes())];
        if let Some(dir) = download_dir {
            params.push(XmlRpcValue::Str(format!("d.directory.set={}", dir)));
        }

        match self.call(method, &params).await {
            Ok(_) => Ok(InjectOutcome::Success),
            Err(e) => {
                warn!(error = %e, "rtorrent injection failed");
                Ok(InjectOutcome::Failure)
            }
        }
    }

    async fn recheck_torrent(&self, info_hash: &str) -> Result<(), TorrentClientError> {
        self.call("d.check_hash", &[XmlRpcValue::Str(info_hash.to_ascii_uppercase())]).await?;
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        self.call("system.client_version", &[]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_array_of_strings() {
        let xml = "<?xml version=\"1.0\"?><methodResponse><params><param><value><array><data>\
            <value><array><data><value><string>ABCD</string></value><value><i8>1</i8></value></data></array></value>\
        </data></array></value></param></params></methodResponse>";

        let parsed = parse_response(xml).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_array().unwrap();
        assert_eq!(row[0].as_str(), Some("ABCD"));
    }

    #[test]
    fn encodes_method_call_with_base64_param() {
        let call = encode_call("load.raw", &[XmlRpcValue::Str(String::new()), XmlRpcValue::Base64(vec![1, 2, 3])]);
        assert!(call.contains("<methodName>load.raw</methodName>"));
        assert!(call.contains("<base64>"));
    }
}
