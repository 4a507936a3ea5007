//! Incremental UTF-8 decoding for streamed response bodies.
//!
//! Network chunks can end in the middle of a multi-byte character. The
//! decoder keeps the incomplete tail and prepends it to the next chunk, so the
//! concatenation of every `decode` call plus `finish` equals decoding the whole
//! body at once, however it was split. Invalid sequences become U+FFFD using
//! the same maximal-subpart rule as `String::from_utf8_lossy`, and a leading
//! byte-order mark is dropped.

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    bom_checked: bool,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `chunk` as forms complete characters.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut rest: &[u8] = &input;
        if !self.bom_checked {
            if rest.len() < BOM.len() && BOM.starts_with(rest) {
                self.pending = input;
                return String::new();
            }
            self.bom_checked = true;
            if let Some(stripped) = rest.strip_prefix(BOM) {
                rest = stripped;
            }
        }

        let mut out = String::with_capacity(rest.len());
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes the decoder at end of stream. A dangling partial character
    /// becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        self.bom_checked = false;
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Drops any buffered partial character without emitting it.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.bom_checked = false;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_chunks(chunks: &[&[u8]]) -> String {
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&decoder.decode(chunk));
        }
        out.push_str(&decoder.finish());
        out
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let euro = "€".as_bytes();
        assert_eq!(euro.len(), 3);

        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"Cost: "), "Cost: ");
        assert_eq!(decoder.decode(&euro[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&euro[1..2]), "");
        assert_eq!(decoder.decode(&[euro[2], b'5']), "€5");
        assert!(!decoder.has_pending());
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn every_split_point_matches_whole_body_decode() {
        let body = "Policy: 15 días de PTO — 有給休暇 🎉 done".as_bytes();
        for first in 0..=body.len() {
            for second in first..=body.len() {
                let decoded = decode_chunks(&[&body[..first], &body[first..second], &body[second..]]);
                assert_eq!(
                    decoded,
                    String::from_utf8_lossy(body),
                    "split at {first}/{second}"
                );
            }
        }
    }

    #[test]
    fn invalid_bytes_match_lossy_decoding_regardless_of_chunking() {
        let body: &[u8] = b"ok \xF0\x9F\x98 then \xFF\xFE and \xE2\x82";
        let expected = String::from_utf8_lossy(body);
        for split in 0..=body.len() {
            assert_eq!(
                decode_chunks(&[&body[..split], &body[split..]]),
                expected,
                "split at {split}"
            );
        }
    }

    #[test]
    fn byte_by_byte_delivery() {
        let body = "naïve café 😀".as_bytes();
        let chunks: Vec<&[u8]> = body.chunks(1).collect();
        assert_eq!(decode_chunks(&chunks), "naïve café 😀");
    }

    #[test]
    fn leading_bom_is_stripped_even_when_split() {
        let mut body = BOM.to_vec();
        body.extend_from_slice("Hi".as_bytes());
        assert_eq!(decode_chunks(&[&body[..1], &body[1..2], &body[2..]]), "Hi");

        // Only the first BOM is dropped.
        let mut doubled = BOM.to_vec();
        doubled.extend_from_slice(BOM);
        assert_eq!(decode_chunks(&[doubled.as_slice()]), "\u{FEFF}");
    }

    #[test]
    fn truncated_tail_flushes_as_replacement() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"abc\xE2\x82"), "abc");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"x\xC3"), "x");
        decoder.reset();
        assert!(!decoder.has_pending());
        assert_eq!(decoder.decode(b"\xA9"), "\u{FFFD}");
    }

    #[test]
    fn empty_chunks_are_harmless() {
        let pieces: [&[u8]; 5] = [b"", b"a", b"", b"b", b""];
        assert_eq!(decode_chunks(&pieces), "ab");
        assert_eq!(decode_chunks(&[]), "");
    }
}
