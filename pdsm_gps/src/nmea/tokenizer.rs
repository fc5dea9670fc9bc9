use crate::constants::MAX_NMEA_TOKENS;

/// Comma-separated fields of one sentence.
///
/// The leading `$`, the line terminator and a trailing `*hh` checksum are
/// stripped first. The checksum itself is not verified.
pub struct Tokenizer<'a> {
    tokens: Vec<&'a [u8]>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(sentence: &'a [u8]) -> Self {
        let mut s = sentence;
        if let Some(rest) = s.strip_prefix(b"$") {
            s = rest;
        }
        if let Some(rest) = s.strip_suffix(b"\n") {
            s = rest;
        }
        if let Some(rest) = s.strip_suffix(b"\r") {
            s = rest;
        }
        if s.len() >= 3 && s[s.len() - 3] == b'*' {
            s = &s[..s.len() - 3];
        }

        let mut tokens = Vec::with_capacity(MAX_NMEA_TOKENS);
        let mut rest = s;
        while !rest.is_empty() {
            let end = rest.iter().position(|&c| c == b',').unwrap_or(rest.len());
            if tokens.len() < MAX_NMEA_TOKENS {
                tokens.push(&rest[..end]);
            }
            rest = rest.get(end + 1..).unwrap_or(&[]);
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Field at `index`; missing fields read as empty.
    pub fn get(&self, index: usize) -> &'a [u8] {
        self.tokens.get(index).copied().unwrap_or(&[])
    }
}

/// Decimal integer of the whole token; `-1` when empty or not all digits.
pub fn str2int(token: &[u8]) -> i32 {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return -1;
    }
    token
        .iter()
        .fold(0i32, |acc, &c| acc.wrapping_mul(10).wrapping_add(i32::from(c - b'0')))
}

/// Float value of the token; `-1.0` when empty, `0.0` when too long or unparsable.
pub fn str2float(token: &[u8]) -> f64 {
    if token.is_empty() {
        return -1.0;
    }
    if token.len() >= 16 {
        return 0.0;
    }
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}
