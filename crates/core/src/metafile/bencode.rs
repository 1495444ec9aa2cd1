//! Minimal bencode decoder that tracks byte spans as it walks the input.
//!
//! The decoder exists for one reason: the infohash of a torrent is defined
//! over the exact bytes a producer wrote for the `info` dictionary, not over
//! a semantically-equivalent re-encoding. A decode-then-re-encode-then-hash
//! approach (as a generic bencode crate would naturally offer) can silently
//! diverge from the original hash whenever the producer used non-canonical
//! key ordering or integer formatting. Tracking the span during the single
//! decode pass sidesteps the question entirely.

use std::fmt;

#[derive(Debug)]
pub enum BencodeError {
    UnexpectedEof,
    UnexpectedToken(u8),
    InvalidInteger,
    InvalidLength,
    TrailingData,
    MissingKey(&'static str),
    NonUtf8String(&'static str),
}

impl fmt::Display for BencodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BencodeError::UnexpectedEof => write!(f, "unexpected end of input"),
            BencodeError::UnexpectedToken(b) => write!(f, "unexpected token byte {:#04x}", b),
            BencodeError::InvalidInteger => write!(f, "invalid bencode integer"),
            BencodeError::InvalidLength => write!(f, "invalid bencode string length"),
            BencodeError::TrailingData => write!(f, "trailing bytes after root value"),
            BencodeError::MissingKey(k) => write!(f, "missing required key `{}`", k),
            BencodeError::NonUtf8String(field) => write!(f, "field `{}` is not valid utf-8", field),
        }
    }
}

impl std::error::Error for BencodeError {}

/// A decoded bencode value. Dict keys preserve parse order rather than
/// sorting, so callers that need canonical ordering sort explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<BValue>),
    Dict(Vec<(Vec<u8>, BValue)>),
}

impl BValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            BValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BValue]> {
        match self {
            BValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Vec<u8>, BValue)]> {
        match self {
            BValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn dict_get(&self, key: &[u8]) -> Option<&BValue> {
        self.as_dict()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.data.get(self.pos).copied().ok_or(BencodeError::UnexpectedEof)
    }

    fn decode_value(&mut self) -> Result<BValue, BencodeError> {
        match self.peek()? {
            b'i' => self.decode_int(),
            b'l' => self.decode_list(),
            b'd' => self.decode_dict().map(BValue::Dict),
            b'0'..=b'9' => self.decode_bytestring().map(BValue::Bytes),
            other => Err(BencodeError::UnexpectedToken(other)),
        }
    }

    fn decode_int(&mut self) -> Result<BValue, BencodeError> {
        debug_assert_eq!(self.data[self.pos], b'i');
        self.pos += 1;
        let start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let raw = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| BencodeError::InvalidInteger)?;
        let n: i64 = raw.parse().map_err(|_| BencodeError::InvalidInteger)?;
        self.pos += 1; // consume 'e'
        Ok(BValue::Int(n))
    }

    fn decode_bytestring(&mut self) -> Result<Vec<u8>, BencodeError> {
        let start = self.pos;
        while self.peek()? != b':' {
            self.pos += 1;
        }
        let len_raw = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| BencodeError::InvalidLength)?;
        let len: usize = len_raw.parse().map_err(|_| BencodeError::InvalidLength)?;
        self.pos += 1; // consume ':'
        let end = self.pos.checked_add(len).ok_or(BencodeError::InvalidLength)?;
        if end > self.data.len() {
            return Err(BencodeError::UnexpectedEof);
        }
        let bytes = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn decode_list(&mut self) -> Result<BValue, BencodeError> {
        self.pos += 1; // 'l'
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.decode_value()?);
        }
        self.pos += 1; // 'e'
        Ok(BValue::List(items))
    }

    fn decode_dict(&mut self) -> Result<Vec<(Vec<u8>, BValue)>, BencodeError> {
        self.pos += 1; // 'd'
        let mut entries = Vec::new();
        while self.peek()? != b'e' {
            let key = self.decode_bytestring()?;
            let value = self.decode_value()?;
            entries.push((key, value));
        }
        self.pos += 1; // 'e'
        Ok(entries)
    }

    /// Decodes the root dictionary, additionally returning the byte span
    /// (relative to `data`) covered by the value at key `info`.
    fn decode_root_with_info_span(
        &mut self,
    ) -> Result<(Vec<(Vec<u8>, BValue)>, std::ops::Range<usize>), BencodeError> {
        if self.peek()? != b'd' {
            return Err(BencodeError::UnexpectedToken(self.peek()?));
        }
        self.pos += 1; // 'd'
        let mut entries = Vec::new();
        let mut info_span = None;
        while self.peek()? != b'e' {
            let key = self.decode_bytestring()?;
            let value_start = self.pos;
            let value = self.decode_value()?;
            let value_end = self.pos;
            if key == b"info" {
                info_span = Some(value_start..value_end);
            }
            entries.push((key, value));
        }
        self.pos += 1; // 'e'
        let span = info_span.ok_or(BencodeError::MissingKey("info"))?;
        Ok((entries, span))
    }
}

/// Decodes a bencoded byte string, rejecting trailing garbage.
pub fn decode(data: &[u8]) -> Result<BValue, BencodeError> {
    let mut dec = Decoder::new(data);
    let value = dec.decode_value()?;
    if dec.pos != data.len() {
        return Err(BencodeError::TrailingData);
    }
    Ok(value)
}

/// Decodes the root dictionary of a `.torrent` file, returning both the
/// parsed entries and the exact byte range of the `info` value as it
/// appeared in `data`. Does not require the whole buffer to be consumed by
/// the root value's own parse (callers that care should check the caller's
/// cursor), since metafiles are sometimes followed by trailer bytes in the
/// wild; we allow it here and let `Metafile::parse` decide.
pub fn decode_root_with_info_span(
    data: &[u8],
) -> Result<(Vec<(Vec<u8>, BValue)>, std::ops::Range<usize>), BencodeError> {
    let mut dec = Decoder::new(data);
    dec.decode_root_with_info_span()
}

/// Canonically bencodes a value: dict keys are sorted lexically by raw
/// bytes, matching BEP 3's requirement that `info` hashing be stable.
pub fn encode(value: &BValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &BValue, out: &mut Vec<u8>) {
    match value {
        BValue::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        BValue::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        BValue::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        BValue::Dict(entries) => {
            let mut sorted: Vec<&(Vec<u8>, BValue)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            out.push(b'd');
            for (k, v) in sorted {
                encode_into(&BValue::Bytes(k.clone()), out);
                encode_into(v, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_integers() {
        assert_eq!(decode(b"i42e").unwrap(), BValue::Int(42));
        assert_eq!(decode(b"i-7e").unwrap(), BValue::Int(-7));
    }

    #[test]
    fn decodes_bytestrings() {
        assert_eq!(decode(b"4:spam").unwrap(), BValue::Bytes(b"spam".to_vec()));
        assert_eq!(decode(b"0:").unwrap(), BValue::Bytes(vec![]));
    }

    #[test]
    fn decodes_lists_and_dicts() {
        let v = decode(b"l4:spam4:eggse").unwrap();
        assert_eq!(
            v,
            BValue::List(vec![BValue::Bytes(b"spam".to_vec()), BValue::Bytes(b"eggs".to_vec())])
        );

        let v = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        assert_eq!(
            v,
            BValue::Dict(vec![
                (b"cow".to_vec(), BValue::Bytes(b"moo".to_vec())),
                (b"spam".to_vec(), BValue::Bytes(b"eggs".to_vec())),
            ])
        );
    }

    #[test]
    fn rejects_trailing_data() {
        assert!(matches!(decode(b"i1ei2e"), Err(BencodeError::TrailingData)));
    }

    #[test]
    fn encode_sorts_dict_keys() {
        let value = BValue::Dict(vec![
            (b"zeta".to_vec(), BValue::Int(1)),
            (b"alpha".to_vec(), BValue::Int(2)),
        ]);
        assert_eq!(encode(&value), b"d5:alphai2e4:zetai1ee");
    }

    #[test]
    fn info_span_covers_exact_bytes() {
        let data = b"d4:infod4:name3:foo6:lengthi5eee";
        let (_, span) = decode_root_with_info_span(data).unwrap();
        assert_eq!(&data[span], &b"d4:name3:foo6:lengthi5ee"[..]);
    }

    #[test]
    fn missing_info_key_is_rejected() {
        let data = b"d3:foo3:bare";
        assert!(matches!(
            decode_root_with_info_span(data),
            Err(BencodeError::MissingKey("info"))
        ));
    }
}
