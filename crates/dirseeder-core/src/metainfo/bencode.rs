//! Minimal zero-copy bencode decoder.
//!
//! Dictionaries keep the exact byte span they were decoded from so the info
//! hash can be computed over the original encoding.

use thiserror::Error;

/// Nesting limit for lists and dictionaries.
const MAX_DEPTH: usize = 64;
/// Upper bound for a single byte string (100 MiB).
const MAX_STRING_LENGTH: usize = 100 * 1024 * 1024;

/// Decoding failure with the byte offset where it was detected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid bencode at byte {offset}: {reason}")]
pub(crate) struct BencodeError {
    /// Offset into the input.
    pub(crate) offset: usize,
    /// Static description of the defect.
    pub(crate) reason: &'static str,
}

/// Decoded bencode value borrowing from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value<'a> {
    Int(i64),
    Bytes(&'a [u8]),
    List(Vec<Value<'a>>),
    Dict(Dict<'a>),
}

/// Dictionary entries in encounter order plus the raw encoded span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dict<'a> {
    entries: Vec<(&'a [u8], Value<'a>)>,
    raw: &'a [u8],
}

impl<'a> Dict<'a> {
    pub(crate) fn get(&self, key: &[u8]) -> Option<&Value<'a>> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| value)
    }

    pub(crate) const fn raw(&self) -> &'a [u8] {
        self.raw
    }
}

impl<'a> Value<'a> {
    pub(crate) const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) const fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Self::Bytes(bytes) => Some(*bytes),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&'a str> {
        self.as_bytes()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub(crate) fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) const fn as_dict(&self) -> Option<&Dict<'a>> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

/// Decode exactly one value spanning the whole input.
pub(crate) fn decode(data: &[u8]) -> Result<Value<'_>, BencodeError> {
    let mut parser = Parser { data, pos: 0 };
    let value = parser.value(0)?;
    if parser.pos != data.len() {
        return Err(BencodeError {
            offset: parser.pos,
            reason: "trailing data after value",
        });
    }
    Ok(value)
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn error(&self, reason: &'static str) -> BencodeError {
        BencodeError {
            offset: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn value(&mut self, depth: usize) -> Result<Value<'a>, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'i') => self.integer().map(Value::Int),
            Some(b'l') => self.list(depth),
            Some(b'd') => self.dict(depth),
            Some(b'0'..=b'9') => self.bytes().map(Value::Bytes),
            Some(_) => Err(self.error("unexpected type marker")),
        }
    }

    fn list(&mut self, depth: usize) -> Result<Value<'a>, BencodeError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated list")),
                Some(b'e') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Some(_) => items.push(self.value(depth + 1)?),
            }
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Value<'a>, BencodeError> {
        let start = self.pos;
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated dictionary")),
                Some(b'e') => {
                    self.pos += 1;
                    let data = self.data;
                    let raw = &data[start..self.pos];
                    return Ok(Value::Dict(Dict { entries, raw }));
                }
                Some(b'0'..=b'9') => {
                    let key = self.bytes()?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                Some(_) => return Err(self.error("dictionary key must be a byte string")),
            }
        }
    }

    fn integer(&mut self) -> Result<i64, BencodeError> {
        self.pos += 1;
        let start = self.pos;
        let end = self.data[start..]
            .iter()
            .position(|&byte| byte == b'e')
            .map(|offset| start + offset)
            .ok_or_else(|| self.error("unterminated integer"))?;
        let digits = &self.data[start..end];
        let unsigned = digits.strip_prefix(b"-").unwrap_or(digits);
        if unsigned.is_empty() || !unsigned.iter().all(u8::is_ascii_digit) {
            return Err(self.error("integer is not a decimal number"));
        }
        if unsigned.len() > 1 && unsigned[0] == b'0' {
            return Err(self.error("integer has leading zeros"));
        }
        if digits == b"-0" {
            return Err(self.error("negative zero"));
        }
        let value = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| self.error("integer out of range"))?;
        self.pos = end + 1;
        Ok(value)
    }

    fn bytes(&mut self) -> Result<&'a [u8], BencodeError> {
        let start = self.pos;
        let colon = self.data[start..]
            .iter()
            .position(|&byte| byte == b':')
            .map(|offset| start + offset)
            .ok_or_else(|| self.error("byte string missing length separator"))?;
        let digits = &self.data[start..colon];
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(self.error("byte string length is not a decimal number"));
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(self.error("byte string length has leading zeros"));
        }
        let length = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .filter(|length| *length <= MAX_STRING_LENGTH)
            .ok_or_else(|| self.error("byte string too long"))?;
        let body = colon + 1;
        let end = body
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.error("byte string exceeds input"))?;
        self.pos = end;
        let data = self.data;
        Ok(&data[body..end])
    }
}
