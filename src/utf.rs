pub mod utf16sequence;
pub mod utf8sequence;

use thiserror::Error;

/// Largest Unicode scalar value.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endianness {
    BigEndian,
    LittleEndian,
}

impl Endianness {
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::BigEndian
        } else {
            Endianness::LittleEndian
        }
    }

    pub const fn bytes_to_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endianness::BigEndian => u16::from_be_bytes(bytes),
            Endianness::LittleEndian => u16::from_le_bytes(bytes),
        }
    }
}

#[inline]
pub const fn byte_swap(unit: u16) -> u16 {
    unit.swap_bytes()
}

#[inline]
pub const fn byte_swap_if(unit: u16, swap: bool) -> u16 {
    if swap {
        byte_swap(unit)
    } else {
        unit
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A surrogate pair is cut short, malformed, or starts with a low surrogate.
    TruncatedSequence,
    /// A decoded UTF-8 symbol lies above `MAX_CODEPOINT`.
    CodePointOutOfRange,
}

/// Failure to convert between Unicode encodings.
///
/// `position` counts the source units consumed when the problem was found,
/// not the code points produced so far.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} (position {position})")]
pub struct ConvertError {
    pub position: usize,
    pub kind: ErrorKind,
    message: &'static str,
}

impl ConvertError {
    pub(crate) const fn new(position: usize, kind: ErrorKind, message: &'static str) -> Self {
        Self {
            position,
            kind,
            message,
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

/// Byte order mark found at the start of a buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Bom {
    #[default]
    None,
    Utf16Le,
    Utf16Be,
    Utf8,
}

impl Bom {
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xFF, 0xFE, ..] => Bom::Utf16Le,
            [0xFE, 0xFF, ..] => Bom::Utf16Be,
            [0xEF, 0xBB, 0xBF, ..] => Bom::Utf8,
            _ => Bom::None,
        }
    }

    pub const fn len(self) -> usize {
        match self {
            Bom::None => 0,
            Bom::Utf16Le | Bom::Utf16Be => 2,
            Bom::Utf8 => 3,
        }
    }

    pub const fn is_empty(self) -> bool {
        matches!(self, Bom::None)
    }

    /// Byte order of the UTF-16 units following the mark, if it is a UTF-16 mark.
    pub const fn endianness(self) -> Option<Endianness> {
        match self {
            Bom::Utf16Le => Some(Endianness::LittleEndian),
            Bom::Utf16Be => Some(Endianness::BigEndian),
            Bom::None | Bom::Utf8 => None,
        }
    }

    pub fn strip(bytes: &[u8]) -> (Self, &[u8]) {
        let bom = Self::detect(bytes);
        (bom, &bytes[bom.len()..])
    }
}

pub fn detect_bom(bytes: &[u8]) -> Bom {
    Bom::detect(bytes)
}

/// Code points decoded from a raw buffer, with the mark that selected the decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub bom: Bom,
    pub codepoints: Vec<u32>,
}

/// Decodes a raw buffer, choosing UTF-16 or UTF-8 by its byte order mark.
///
/// Buffers without a mark are treated as UTF-8.
pub fn decode_buffer(bytes: &[u8]) -> Result<Decoded, ConvertError> {
    let (bom, body) = Bom::strip(bytes);
    let codepoints = decode_body(bom, body)?;
    Ok(Decoded { bom, codepoints })
}

/// Decodes the bytes that follow an already stripped `bom`.
///
/// UTF-16 units are read in host order and byte swapped when the mark says
/// otherwise, so error positions are counted in 16-bit units after the mark.
pub fn decode_body(bom: Bom, body: &[u8]) -> Result<Vec<u32>, ConvertError> {
    let Some(endianness) = bom.endianness() else {
        return utf8sequence::utf32_from_utf8(body);
    };
    let chunks = body.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        return Err(ConvertError::new(
            body.len() / 2 + 1,
            ErrorKind::TruncatedSequence,
            "Invalid code sequence in UTF-16 - odd number of bytes",
        ));
    }
    let host = Endianness::native();
    let swap = endianness != host;
    let units = chunks.map(|pair| host.bytes_to_u16([pair[0], pair[1]]));
    utf16sequence::Utf16Decoder::new(units, swap).collect()
}
