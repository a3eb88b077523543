use std::borrow::Cow;

use encoding_rs::Encoding;

/// A text encoding the decoder can try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Ascii,
    Utf8,
    /// UTF-16 honoring a byte-order mark, little-endian without one.
    Utf16,
    /// UTF-32 honoring a byte-order mark, little-endian without one.
    Utf32,
    /// ISO-8859-1. Every byte sequence decodes.
    Latin1,
    Encoding(&'static Encoding),
}

impl Charset {
    /// Resolve a caller or header supplied label.
    pub fn from_label(label: &str) -> Option<Charset> {
        let normalized = label
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_ascii_lowercase();

        let charset = match normalized.as_str() {
            "ascii" | "us-ascii" | "646" => Charset::Ascii,
            "utf-8" | "utf8" | "utf_8" => Charset::Utf8,
            "utf-16" | "utf16" | "utf_16" => Charset::Utf16,
            "utf-32" | "utf32" | "utf_32" => Charset::Utf32,
            "latin-1" | "latin1" | "latin_1" | "iso-8859-1" | "iso8859-1" | "iso_8859_1"
            | "l1" => Charset::Latin1,
            "shift-jis" | "shiftjis" | "sjis" => Charset::Encoding(encoding_rs::SHIFT_JIS),
            other => {
                let encoding = Encoding::for_label(other.as_bytes())
                    .or_else(|| Encoding::for_label(other.replace('_', "-").as_bytes()))?;
                Charset::Encoding(encoding)
            }
        };
        Some(charset)
    }

    /// Canonical lower-case name.
    pub fn name(&self) -> String {
        match self {
            Charset::Ascii => "ascii".to_string(),
            Charset::Utf8 => "utf-8".to_string(),
            Charset::Utf16 => "utf-16".to_string(),
            Charset::Utf32 => "utf-32".to_string(),
            Charset::Latin1 => "latin-1".to_string(),
            Charset::Encoding(encoding) => encoding.name().to_ascii_lowercase(),
        }
    }

    /// Strictly decode `bytes`. Any malformed sequence yields `None`.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Charset::Utf16 => decode_utf16(bytes),
            Charset::Utf32 => decode_utf32(bytes),
            Charset::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Charset::Encoding(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
        }
    }
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        _ => (bytes, false),
    };
    if body.len() % 2 != 0 {
        return None;
    }

    let units = body.chunks_exact(2).map(|pair| {
        let pair = [pair[0], pair[1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    });
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn decode_utf32(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = match bytes {
        [0xFF, 0xFE, 0x00, 0x00, rest @ ..] => (rest, false),
        [0x00, 0x00, 0xFE, 0xFF, rest @ ..] => (rest, true),
        _ => (bytes, false),
    };
    if body.len() % 4 != 0 {
        return None;
    }

    body.chunks_exact(4)
        .map(|quad| {
            let quad = [quad[0], quad[1], quad[2], quad[3]];
            let scalar = if big_endian {
                u32::from_be_bytes(quad)
            } else {
                u32::from_le_bytes(quad)
            };
            char::from_u32(scalar)
        })
        .collect()
}
