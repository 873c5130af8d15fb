use std::iter::FusedIterator;

use tracing::debug;

use crate::utf::*;

#[inline]
const fn is_high_surrogate(unit: u16) -> bool {
    matches!(unit, 0xD800..=0xDBFF)
}

#[inline]
const fn is_low_surrogate(unit: u16) -> bool {
    matches!(unit, 0xDC00..=0xDFFF)
}

#[inline]
const fn combine_surrogates(high: u16, low: u16) -> u32 {
    0x10000 + ((((high & 0x3FF) as u32) << 10) | (low & 0x3FF) as u32)
}

/// Lazily decodes UTF-16 units into code points.
///
/// Every unit is byte swapped before it is looked at when `swap` is set. The
/// decoder stops for good after the first error or the end of its input.
pub struct Utf16Decoder<I> {
    input: I,
    swap: bool,
    consumed: usize,
    done: bool,
}

impl<I: Iterator<Item = u16>> Utf16Decoder<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(input: T, swap: bool) -> Self {
        Self {
            input: input.into_iter(),
            swap,
            consumed: 0,
            done: false,
        }
    }

    #[inline]
    fn next_unit(&mut self) -> Option<u16> {
        let Some(unit) = self.input.next() else {
            self.done = true;
            return None;
        };
        self.consumed += 1;
        Some(byte_swap_if(unit, self.swap))
    }

    fn fail(&mut self, plain: &'static str, swapped: &'static str) -> ConvertError {
        self.done = true;
        let message = if self.swap { swapped } else { plain };
        debug!(position = self.consumed, reason = message, "UTF-16 decode failed");
        ConvertError::new(self.consumed, ErrorKind::TruncatedSequence, message)
    }
}

impl<I: Iterator<Item = u16>> Iterator for Utf16Decoder<I> {
    type Item = Result<u32, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let unit = self.next_unit()?;
        if is_low_surrogate(unit) {
            return Some(Err(self.fail(
                "Invalid code sequence in UTF-16",
                "Invalid code sequence in UTF-16 with byte swap",
            )));
        }
        if !is_high_surrogate(unit) {
            return Some(Ok(unit as u32));
        }
        let Some(low) = self.next_unit() else {
            return Some(Err(self.fail(
                "Invalid code sequence in UTF-16 - unexpected end of data",
                "Invalid code sequence in UTF-16 with byte swap - unexpected end of data",
            )));
        };
        if !is_low_surrogate(low) {
            return Some(Err(self.fail(
                "Invalid code sequence in UTF-16 (pair second)",
                "Invalid code sequence in UTF-16 with byte swap (pair second)",
            )));
        }
        Some(Ok(combine_surrogates(unit, low)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let (low, high) = self.input.size_hint();
        (low / 2, high)
    }
}

impl<I: Iterator<Item = u16>> FusedIterator for Utf16Decoder<I> {}

/// Lazily encodes code points as UTF-16 units, swapping bytes after encoding
/// when `swap` is set. Values above the Unicode range are not checked.
pub struct Utf16Encoder<I> {
    input: I,
    swap: bool,
    pending: Option<u16>,
}

impl<I: Iterator<Item = u32>> Utf16Encoder<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(input: T, swap: bool) -> Self {
        Self {
            input: input.into_iter(),
            swap,
            pending: None,
        }
    }
}

impl<I: Iterator<Item = u32>> Iterator for Utf16Encoder<I> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        if let Some(low) = self.pending.take() {
            return Some(low);
        }
        let codepoint = self.input.next()?;
        if codepoint < 0x10000 {
            return Some(byte_swap_if(codepoint as u16, self.swap));
        }
        let offset = codepoint - 0x10000;
        let high = 0xD800 | ((offset >> 10) & 0x3FF) as u16;
        let low = 0xDC00 | (offset & 0x3FF) as u16;
        self.pending = Some(byte_swap_if(low, self.swap));
        Some(byte_swap_if(high, self.swap))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.input.size_hint();
        let pending = self.pending.is_some() as usize;
        (
            low.saturating_add(pending),
            high.and_then(|n| n.checked_mul(2))
                .and_then(|n| n.checked_add(pending)),
        )
    }
}

impl<I: FusedIterator<Item = u32>> FusedIterator for Utf16Encoder<I> {}

pub fn utf32_from_utf16(units: &[u16], swap: bool) -> Result<Vec<u32>, ConvertError> {
    let mut codepoints = Vec::with_capacity(units.len());
    for codepoint in Utf16Decoder::new(units.iter().copied(), swap) {
        codepoints.push(codepoint?);
    }
    Ok(codepoints)
}

pub fn utf16_from_utf32(codepoints: &[u32], swap: bool) -> Vec<u16> {
    let mut units = Vec::with_capacity(codepoints.len());
    units.extend(Utf16Encoder::new(codepoints.iter().copied(), swap));
    units
}
