//! Metafile codec: bencode parsing/serialization, infohash computation, and
//! tree rendering for `.torrent` files (spec component A).

mod bencode;
mod tree;

pub use bencode::{BValue, BencodeError};
pub use tree::render_tree;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// One file entry within a metafile, relative to the torrent's logical root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafileFile {
    pub path: Vec<String>,
    pub length: u64,
}

impl MetafileFile {
    /// The path joined with `/`, the normalized form used for matching.
    pub fn relative_path(&self) -> String {
        self.path.join("/")
    }
}

/// A parsed `.torrent` file per spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafile {
    /// Lowercase hex SHA-1 of the `info` dictionary's exact observed bytes.
    pub info_hash: String,
    pub announce: Option<String>,
    pub announce_list: Vec<Vec<String>>,
    pub name: String,
    pub files: Vec<MetafileFile>,
    pub piece_length: u64,
    pub pieces: Vec<u8>,
    pub private: bool,
    /// The exact bytes this metafile was parsed from. Empty for a metafile
    /// that was never parsed from a byte buffer (synthesized in-process).
    /// Writing or injecting a real candidate must use this, not
    /// [`Metafile::serialize`], so the infohash a tracker sees matches
    /// `info_hash` exactly.
    #[serde(default)]
    pub raw: Vec<u8>,
}

#[derive(Debug)]
pub enum MetafileError {
    Bencode(BencodeError),
    RootNotDict,
    MissingInfo,
    MixedFileMode,
    InvalidUtf8(&'static str),
}

impl fmt::Display for MetafileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetafileError::Bencode(e) => write!(f, "{}", e),
            MetafileError::RootNotDict => write!(f, "root value is not a dictionary"),
            MetafileError::MissingInfo => write!(f, "missing required key `info`"),
            MetafileError::MixedFileMode => {
                write!(f, "info dict declares both or neither of `length`/`files`")
            }
            MetafileError::InvalidUtf8(field) => write!(f, "field `{}` is not valid utf-8", field),
        }
    }
}

impl std::error::Error for MetafileError {}

impl From<BencodeError> for MetafileError {
    fn from(e: BencodeError) -> Self {
        match e {
            BencodeError::MissingKey("info") => MetafileError::MissingInfo,
            other => MetafileError::Bencode(other),
        }
    }
}

fn bytes_to_string(b: &[u8], field: &'static str) -> Result<String, MetafileError> {
    String::from_utf8(b.to_vec()).map_err(|_| MetafileError::InvalidUtf8(field))
}

impl Metafile {
    /// Decodes a `.torrent` byte buffer. The infohash is computed from the
    /// exact byte span the `info` value occupied in `data`, never from a
    /// re-encoding, per the codec's core invariant.
    pub fn parse(data: &[u8]) -> Result<Self, MetafileError> {
        let (entries, info_span) = match bencode::decode_root_with_info_span(data) {
            Ok(v) => v,
            Err(BencodeError::MissingKey("info")) => return Err(MetafileError::MissingInfo),
            Err(BencodeError::UnexpectedToken(_)) => return Err(MetafileError::RootNotDict),
            Err(e) => return Err(MetafileError::Bencode(e)),
        };

        let mut hasher = Sha1::new();
        hasher.update(&data[info_span.clone()]);
        let info_hash = hex::encode(hasher.finalize());

        let info = entries
            .iter()
            .find(|(k, _)| k == b"info")
            .map(|(_, v)| v)
            .ok_or(MetafileError::MissingInfo)?;

        let name_bytes = info.dict_get(b"name").and_then(BValue::as_bytes).unwrap_or(b"");
        let name = bytes_to_string(name_bytes, "info.name")?;

        let piece_length = info
            .dict_get(b"piece length")
            .and_then(BValue::as_int)
            .unwrap_or(0)
            .max(0) as u64;

        let pieces = info
            .dict_get(b"pieces")
            .and_then(BValue::as_bytes)
            .map(|b| b.to_vec())
            .unwrap_or_default();

        let private = info
            .dict_get(b"private")
            .and_then(BValue::as_int)
            .map(|n| n != 0)
            .unwrap_or(false);

        let has_length = info.dict_get(b"length").is_some();
        let has_files = info.dict_get(b"files").is_some();
        if has_length == has_files {
            // both present or both absent: neither is a valid single state
            return Err(MetafileError::MixedFileMode);
        }

        let files = if has_length {
            let length = info
                .dict_get(b"length")
                .and_then(BValue::as_int)
                .unwrap_or(0)
                .max(0) as u64;
            vec![MetafileFile { path: vec![name.clone()], length }]
        } else {
            let list = info
                .dict_get(b"files")
                .and_then(BValue::as_list)
                .ok_or(MetafileError::MixedFileMode)?;
            let mut out = Vec::with_capacity(list.len());
            for entry in list {
                let length = entry
                    .dict_get(b"length")
                    .and_then(BValue::as_int)
                    .unwrap_or(0)
                    .max(0) as u64;
                let path_list = entry
                    .dict_get(b"path")
                    .and_then(BValue::as_list)
                    .ok_or(MetafileError::MixedFileMode)?;
                let mut segments = Vec::with_capacity(path_list.len());
                for seg in path_list {
                    let seg_bytes = seg.as_bytes().ok_or(MetafileError::MixedFileMode)?;
                    segments.push(bytes_to_string(seg_bytes, "info.files[].path[]")?);
                }
                out.push(MetafileFile { path: segments, length });
            }
            out
        };

        let announce = entries
            .iter()
            .find(|(k, _)| k == b"announce")
            .and_then(|(_, v)| v.as_bytes())
            .map(|b| bytes_to_string(b, "announce"))
            .transpose()?;

        let announce_list = entries
            .iter()
            .find(|(k, _)| k == b"announce-list")
            .and_then(|(_, v)| v.as_list())
            .map(|tiers| {
                tiers
                    .iter()
                    .filter_map(BValue::as_list)
                    .map(|tier| {
                        tier.iter()
                            .filter_map(BValue::as_bytes)
                            .map(|b| String::from_utf8_lossy(b).into_owned())
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Metafile {
            info_hash,
            announce,
            announce_list,
            name,
            files,
            piece_length,
            pieces,
            private,
            raw: data.to_vec(),
        })
    }

    /// Canonically re-encodes this metafile. The output always has sorted
    /// dict keys; re-parsing it yields a metafile whose `info_hash` reflects
    /// the canonical bytes just written, which only equals the original
    /// `info_hash` when the original input was itself canonical. Only
    /// appropriate for metafiles that have no original byte buffer to fall
    /// back to (`raw` empty) — real candidates should write/inject `raw`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut info_entries: Vec<(Vec<u8>, BValue)> = vec![
            (b"name".to_vec(), BValue::Bytes(self.name.clone().into_bytes())),
            (b"piece length".to_vec(), BValue::Int(self.piece_length as i64)),
            (b"pieces".to_vec(), BValue::Bytes(self.pieces.clone())),
        ];
        if self.private {
            info_entries.push((b"private".to_vec(), BValue::Int(1)));
        }

        if self.files.len() == 1 && self.files[0].path == vec![self.name.clone()] {
            info_entries.push((b"length".to_vec(), BValue::Int(self.files[0].length as i64)));
        } else {
            let files = self
                .files
                .iter()
                .map(|f| {
                    BValue::Dict(vec![
                        (b"length".to_vec(), BValue::Int(f.length as i64)),
                        (
                            b"path".to_vec(),
                            BValue::List(
                                f.path
                                    .iter()
                                    .map(|seg| BValue::Bytes(seg.clone().into_bytes()))
                                    .collect(),
                            ),
                        ),
                    ])
                })
                .collect();
            info_entries.push((b"files".to_vec(), BValue::List(files)));
        }

        let mut root_entries: Vec<(Vec<u8>, BValue)> = Vec::new();
        if let Some(announce) = &self.announce {
            root_entries.push((b"announce".to_vec(), BValue::Bytes(announce.clone().into_bytes())));
        }
        if !self.announce_list.is_empty() {
            let tiers = self
                .announce_list
                .iter()
                .map(|tier| {
                    BValue::List(
                        tier.iter()
                            .map(|url| BValue::Bytes(url.clone().into_bytes()))
                            .collect(),
                    )
                })
                .collect();
            root_entries.push((b"announce-list".to_vec(), BValue::List(tiers)));
        }
        root_entries.push((b"info".to_vec(), BValue::Dict(info_entries)));

        bencode::encode(&BValue::Dict(root_entries))
    }

    /// The bytes to write or inject for this metafile: the original parsed
    /// bytes when there are any (preserving `info_hash` exactly), else the
    /// canonical re-encoding for metafiles synthesized in-process.
    pub fn bytes(&self) -> Vec<u8> {
        if self.raw.is_empty() {
            self.serialize()
        } else {
            self.raw.clone()
        }
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }

    pub fn tree(&self) -> String {
        tree::render_tree(&self.name, &self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_str(s: &str) -> String {
        format!("{}:{}", s.len(), s)
    }

    fn single_file_torrent(name: &str, length: u64, pieces: &str) -> Vec<u8> {
        let info = format!(
            "d6:lengthi{}e4:name{}12:piece lengthi16384e6:pieces{}e",
            length,
            encode_str(name),
            encode_str(pieces)
        );
        format!(
            "d8:announce20:http://tracker.test/4:info{}e",
            info
        )
        .into_bytes()
    }

    #[test]
    fn parses_single_file_torrent_and_computes_infohash() {
        let data = single_file_torrent("foo.mkv", 1_000_000_000, "01234567890123456789");
        let m = Metafile::parse(&data).unwrap();
        assert_eq!(m.name, "foo.mkv");
        assert_eq!(m.files, vec![MetafileFile { path: vec!["foo.mkv".into()], length: 1_000_000_000 }]);
        assert_eq!(m.info_hash.len(), 40);
        assert_eq!(m.announce.as_deref(), Some("http://tracker.test/"));
    }

    #[test]
    fn rejects_missing_info() {
        let data = b"d8:announce11:http://x/e".to_vec();
        let err = Metafile::parse(&data).unwrap_err();
        assert!(matches!(err, MetafileError::MissingInfo));
    }

    #[test]
    fn rejects_root_that_is_not_a_dict() {
        let data = b"4:spam".to_vec();
        let err = Metafile::parse(&data).unwrap_err();
        assert!(matches!(err, MetafileError::RootNotDict));
    }

    #[test]
    fn rejects_mixed_file_mode() {
        let info = "d6:lengthi5e5:filesle4:name3:foo12:piece lengthi1e6:pieces0:e";
        let data = format!("d4:info{}e", info).into_bytes();
        let err = Metafile::parse(&data).unwrap_err();
        assert!(matches!(err, MetafileError::MixedFileMode));
    }

    #[test]
    fn round_trips_canonical_metafiles() {
        let data = single_file_torrent("foo.mkv", 1_000_000_000, "01234567890123456789");
        let parsed = Metafile::parse(&data).unwrap();
        let reencoded = parsed.serialize();
        let reparsed = Metafile::parse(&reencoded).unwrap();
        assert_eq!(parsed.name, reparsed.name);
        assert_eq!(parsed.files, reparsed.files);
        assert_eq!(parsed.info_hash, reparsed.info_hash);
    }

    #[test]
    fn multi_file_torrent_parses_nested_paths() {
        let files = "l\
            d6:lengthi10e4:pathl1:a5:a.mkveee\
            d6:lengthi20e4:pathl5:b.txteee\
            e";
        let info = format!(
            "d5:files{}4:name4:show12:piece lengthi1e6:pieces0:e",
            files
        );
        let data = format!("d4:info{}e", info).into_bytes();
        let m = Metafile::parse(&data).unwrap();
        assert_eq!(m.files.len(), 2);
        assert_eq!(m.files[0].path, vec!["a".to_string(), "a.mkv".to_string()]);
        assert_eq!(m.files[0].relative_path(), "a/a.mkv");
    }
}
