// RFC 2279 forms, not limited to four bytes:
// 1 - 0000 0000-0000 007F   0xxxxxxx
// 2 - 0000 0080-0000 07FF   110xxxxx 10xxxxxx
// 3 - 0000 0800-0000 FFFF   1110xxxx 10xxxxxx 10xxxxxx
// 4 - 0001 0000-001F FFFF   11110xxx 10xxxxxx 10xxxxxx 10xxxxxx
// 5 - 0020 0000-03FF FFFF   111110xx 10xxxxxx 10xxxxxx 10xxxxxx 10xxxxxx
// 6 - 0400 0000-7FFF FFFF   1111110x 10xxxxxx ... 10xxxxxx
use std::iter::{FusedIterator, Peekable};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::utf::*;

const LEAD_MASKS: [u8; 6] = [0x7F, 0x1F, 0x0F, 0x07, 0x03, 0x01];
pub const MAX_SEQUENCE_LEN: usize = 6;

#[inline]
pub const fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// Length of the sequence introduced by `lead`, or 0 if it cannot start one.
#[inline]
pub const fn sequence_len(lead: u8) -> usize {
    match lead.leading_ones() {
        0 => 1,
        n @ 2..=6 => n as usize,
        _ => 0,
    }
}

/// Index of the first byte that is not a continuation byte.
pub fn find_first_symbol_byte(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|&byte| !is_continuation(byte))
        .unwrap_or(bytes.len())
}

/// Counts the symbols that fit in `bytes`, trusting each lead byte's length.
pub fn string_len_utf8(bytes: &[u8]) -> usize {
    let mut symbols = 0;
    let mut position = 0;
    while position < bytes.len() {
        let len = sequence_len(bytes[position]);
        if len == 0 {
            position += 1;
            continue;
        }
        position += len;
        if position <= bytes.len() {
            symbols += 1;
        }
    }
    symbols
}

/// Lazily decodes UTF-8 bytes into code points.
///
/// Stray continuation bytes and invalid lead bytes are skipped, and a symbol
/// cut short by the end of input is dropped without an error. The only error
/// is a symbol above `MAX_CODEPOINT`. Nothing is yielded after an error or
/// after the input first runs out.
pub struct Utf8Decoder<I: Iterator<Item = u8>> {
    input: Peekable<I>,
    consumed: usize,
    done: bool,
}

impl<I: Iterator<Item = u8>> Utf8Decoder<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(input: T) -> Self {
        Self {
            input: input.into_iter().peekable(),
            consumed: 0,
            done: false,
        }
    }

    fn resync(&mut self) {
        let skipped = self
            .input
            .peeking_take_while(|&byte| is_continuation(byte))
            .count();
        if skipped > 0 {
            trace!(skipped, position = self.consumed, "skipped stray continuation bytes");
            self.consumed += skipped;
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for Utf8Decoder<I> {
    type Item = Result<u32, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.resync();
            let Some(lead) = self.input.next() else {
                self.done = true;
                return None;
            };
            self.consumed += 1;
            let len = sequence_len(lead);
            if len == 0 {
                trace!(lead, position = self.consumed - 1, "skipped invalid lead byte");
                continue;
            }
            let mut codepoint = (lead & LEAD_MASKS[len - 1]) as u32;
            for _ in 1..len {
                let Some(byte) = self.input.next() else {
                    self.done = true;
                    trace!(len, position = self.consumed, "dropped truncated sequence at end of input");
                    return None;
                };
                self.consumed += 1;
                codepoint = (codepoint << 6) | (byte & 0x3F) as u32;
            }
            if codepoint > MAX_CODEPOINT {
                self.done = true;
                debug!(codepoint, position = self.consumed, "UTF-8 decode failed");
                return Some(Err(ConvertError::new(
                    self.consumed,
                    ErrorKind::CodePointOutOfRange,
                    "Invalid code sequence in UTF-8 - symbol code is out of range (>0x10FFFF)",
                )));
            }
            return Some(Ok(codepoint));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, self.input.size_hint().1)
    }
}

impl<I: Iterator<Item = u8>> FusedIterator for Utf8Decoder<I> {}

/// Writes the UTF-8 form of `codepoint` into `buf`, returning its length.
pub fn encode_codepoint(codepoint: u32, buf: &mut [u8; MAX_SEQUENCE_LEN]) -> usize {
    let (len, marker) = match codepoint {
        0..=0x7F => {
            buf[0] = codepoint as u8;
            return 1;
        }
        0x80..=0x7FF => (2, 0xC0),
        0x800..=0xFFFF => (3, 0xE0),
        0x10000..=0x1FFFFF => (4, 0xF0),
        0x200000..=0x3FFFFFF => (5, 0xF8),
        _ => (6, 0xFC),
    };
    let mut rest = codepoint;
    for byte in buf[1..len].iter_mut().rev() {
        *byte = (rest & 0x3F) as u8 | 0x80;
        rest >>= 6;
    }
    buf[0] = (rest as u8 & LEAD_MASKS[len - 1]) | marker;
    len
}

/// Lazily encodes code points as UTF-8 bytes. Never fails; values above the
/// Unicode range get five or six byte forms. Bit 31 has no place in the six
/// byte form, so values above 0x7FFFFFFF do not round-trip.
pub struct Utf8Encoder<I> {
    input: I,
    buf: [u8; MAX_SEQUENCE_LEN],
    start: usize,
    end: usize,
}

impl<I: Iterator<Item = u32>> Utf8Encoder<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(input: T) -> Self {
        Self {
            input: input.into_iter(),
            buf: [0; MAX_SEQUENCE_LEN],
            start: 0,
            end: 0,
        }
    }
}

impl<I: Iterator<Item = u32>> Iterator for Utf8Encoder<I> {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        if self.start == self.end {
            let codepoint = self.input.next()?;
            self.end = encode_codepoint(codepoint, &mut self.buf);
            self.start = 0;
        }
        let byte = self.buf[self.start];
        self.start += 1;
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.input.size_hint();
        let buffered = self.end - self.start;
        (
            low.saturating_add(buffered),
            high.and_then(|n| n.checked_mul(MAX_SEQUENCE_LEN))
                .and_then(|n| n.checked_add(buffered)),
        )
    }
}

impl<I: FusedIterator<Item = u32>> FusedIterator for Utf8Encoder<I> {}

pub fn utf32_from_utf8(bytes: &[u8]) -> Result<Vec<u32>, ConvertError> {
    let mut codepoints = Vec::with_capacity(bytes.len());
    for codepoint in Utf8Decoder::new(bytes.iter().copied()) {
        codepoints.push(codepoint?);
    }
    codepoints.shrink_to_fit();
    Ok(codepoints)
}

pub fn utf8_from_utf32(codepoints: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(codepoints.len() * 4);
    bytes.extend(Utf8Encoder::new(codepoints.iter().copied()));
    bytes.shrink_to_fit();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lead_byte_lengths() {
        assert_eq!(sequence_len(0x41), 1);
        assert_eq!(sequence_len(0x7F), 1);
        assert_eq!(sequence_len(0x80), 0);
        assert_eq!(sequence_len(0xBF), 0);
        assert_eq!(sequence_len(0xC3), 2);
        assert_eq!(sequence_len(0xE2), 3);
        assert_eq!(sequence_len(0xF0), 4);
        assert_eq!(sequence_len(0xF8), 5);
        assert_eq!(sequence_len(0xFC), 6);
        assert_eq!(sequence_len(0xFD), 6);
        assert_eq!(sequence_len(0xFE), 0);
        assert_eq!(sequence_len(0xFF), 0);
    }

    #[test]
    fn skips_stray_continuation() {
        assert_eq!(utf32_from_utf8(&[0x80, 0x41]).unwrap(), vec![0x41]);
        assert_eq!(utf32_from_utf8(&[0x41, 0xBF, 0xBF, 0x42]).unwrap(), vec![0x41, 0x42]);
    }

    #[test]
    fn skips_invalid_lead() {
        assert_eq!(utf32_from_utf8(&[0xFF, 0x41, 0xFE]).unwrap(), vec![0x41]);
    }

    #[test]
    fn drops_truncated_tail() {
        assert_eq!(utf32_from_utf8(&[0x41, 0xE2, 0x82]).unwrap(), vec![0x41]);
        assert!(utf32_from_utf8(&[0xF0]).unwrap().is_empty());
    }

    #[test]
    fn continuation_pattern_is_not_rechecked() {
        // the second byte is taken as payload even though it is ASCII
        assert_eq!(utf32_from_utf8(&[0xC3, 0x29]).unwrap(), vec![0xE9]);
    }

    #[test]
    fn out_of_range_symbol() {
        // F4 90 80 80 assembles to 0x110000
        let error = utf32_from_utf8(&[0x41, 0xF4, 0x90, 0x80, 0x80, 0x42]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::CodePointOutOfRange);
        assert_eq!(error.position, 5);
    }

    #[test]
    fn decoder_stops_after_error() {
        let mut decoder = Utf8Decoder::new([0xF7, 0xBF, 0xBF, 0xBF, 0x41]);
        assert!(matches!(decoder.next(), Some(Err(_))));
        assert_eq!(decoder.next(), None);
    }

    /// Source that yields a byte, then `None`, then a byte again, forever.
    struct Intermittent(bool);

    impl Iterator for Intermittent {
        type Item = u8;

        fn next(&mut self) -> Option<u8> {
            self.0 = !self.0;
            self.0.then_some(b'A')
        }
    }

    #[test]
    fn decoder_stays_done_after_input_ends() {
        let mut decoder = Utf8Decoder::new(Intermittent(false));
        assert_eq!(decoder.next(), Some(Ok(0x41)));
        assert_eq!(decoder.next(), None);
        assert_eq!(decoder.next(), None);
        let fused: Vec<_> = Utf8Decoder::new(Intermittent(false)).fuse().take(4).collect();
        assert_eq!(fused, vec![Ok(0x41)]);
    }

    #[test]
    fn truncated_sequence_ends_decoding() {
        // a lead byte cut off by a gap in the source is not resumed
        let mut decoder = Utf8Decoder::new([0xC3].into_iter().chain(Intermittent(true)));
        assert_eq!(decoder.next(), None);
        assert_eq!(decoder.next(), None);
    }

    #[test]
    fn decodes_long_forms() {
        assert_eq!(utf32_from_utf8(&[0xF8, 0x88, 0x80, 0x80, 0x80]).unwrap_err().kind, ErrorKind::CodePointOutOfRange);
        // overlong two byte form of '/' is accepted as is
        assert_eq!(utf32_from_utf8(&[0xC0, 0xAF]).unwrap(), vec![0x2F]);
    }

    #[test]
    fn encodes_each_length() {
        assert_eq!(utf8_from_utf32(&[0x24]), vec![0x24]);
        assert_eq!(utf8_from_utf32(&[0xA2]), vec![0xC2, 0xA2]);
        assert_eq!(utf8_from_utf32(&[0x20AC]), vec![0xE2, 0x82, 0xAC]);
        assert_eq!(utf8_from_utf32(&[0x1F600]), vec![0xF0, 0x9F, 0x98, 0x80]);
        assert_eq!(utf8_from_utf32(&[0x200000]), vec![0xF8, 0x88, 0x80, 0x80, 0x80]);
        assert_eq!(utf8_from_utf32(&[0x7FFFFFFF]), vec![0xFD, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF]);
    }

    #[test]
    fn top_bit_is_lost_in_six_byte_form() {
        let bytes = utf8_from_utf32(&[0x8000_0000]);
        assert_eq!(bytes, vec![0xFC, 0x80, 0x80, 0x80, 0x80, 0x80]);
        assert_eq!(utf32_from_utf8(&bytes).unwrap(), vec![0]);
    }

    #[test]
    fn first_symbol_byte() {
        assert_eq!(find_first_symbol_byte(&[0x80, 0xBF, 0x41]), 2);
        assert_eq!(find_first_symbol_byte(&[0x41]), 0);
        assert_eq!(find_first_symbol_byte(&[0x80, 0x80]), 2);
        assert_eq!(find_first_symbol_byte(&[]), 0);
    }

    #[test]
    fn symbol_count() {
        assert_eq!(string_len_utf8("añ€😀".as_bytes()), 4);
        assert_eq!(string_len_utf8(&[0x41, 0xE2, 0x82]), 1);
        assert_eq!(string_len_utf8(&[0xFF, 0x41]), 1);
        assert_eq!(string_len_utf8(&[]), 0);
    }

    proptest! {
        #[test]
        fn matches_std_decoding(text in ".*") {
            let expected: Vec<u32> = text.chars().map(u32::from).collect();
            prop_assert_eq!(utf32_from_utf8(text.as_bytes()).unwrap(), expected);
        }

        #[test]
        fn scalars_survive_utf8(codepoints in prop::collection::vec(0u32..=MAX_CODEPOINT, 0..64)) {
            let bytes = utf8_from_utf32(&codepoints);
            prop_assert_eq!(utf32_from_utf8(&bytes).unwrap(), codepoints);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            if let Ok(codepoints) = utf32_from_utf8(&bytes) {
                prop_assert!(codepoints.iter().all(|&c| c <= MAX_CODEPOINT));
            }
        }
    }
}
