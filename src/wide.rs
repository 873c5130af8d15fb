//! Conversions between UTF-8 and wide strings.
//!
//! A wide string holds fixed-width units whose width is decided once, by a
//! [`WideWidth`] value, rather than by the target platform at each call site.
//! 16-bit strings hold UTF-16, 32-bit strings hold code points directly.

use tracing::trace;

use crate::utf::utf16sequence::{utf16_from_utf32, utf32_from_utf16};
use crate::utf::utf8sequence::{utf32_from_utf8, utf8_from_utf32};
use crate::utf::ConvertError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WideWidth {
    Utf16,
    Utf32,
}

impl WideWidth {
    /// Width of the platform's `wchar_t`.
    pub const fn native() -> Self {
        if cfg!(windows) {
            WideWidth::Utf16
        } else {
            WideWidth::Utf32
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            WideWidth::Utf16 => 16,
            WideWidth::Utf32 => 32,
        }
    }
}

impl Default for WideWidth {
    fn default() -> Self {
        Self::native()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WideString {
    Utf16(Vec<u16>),
    Utf32(Vec<u32>),
}

impl WideString {
    pub fn new(width: WideWidth) -> Self {
        match width {
            WideWidth::Utf16 => WideString::Utf16(Vec::new()),
            WideWidth::Utf32 => WideString::Utf32(Vec::new()),
        }
    }

    pub fn from_units16(units: &[u16]) -> Self {
        WideString::Utf16(units.to_vec())
    }

    pub fn from_units32(units: &[u32]) -> Self {
        WideString::Utf32(units.to_vec())
    }

    pub fn width(&self) -> WideWidth {
        self.as_wide_str().width()
    }

    pub fn len(&self) -> usize {
        self.as_wide_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_wide_str(&self) -> WideStr<'_> {
        match self {
            WideString::Utf16(units) => WideStr::Utf16(units),
            WideString::Utf32(units) => WideStr::Utf32(units),
        }
    }

    /// Code points of the string, decoding surrogate pairs of a 16-bit string.
    pub fn to_utf32(&self) -> Result<Vec<u32>, ConvertError> {
        match self {
            WideString::Utf16(units) => utf32_from_utf16(units, false),
            WideString::Utf32(units) => Ok(units.clone()),
        }
    }
}

/// Borrowed view of a wide string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WideStr<'a> {
    Utf16(&'a [u16]),
    Utf32(&'a [u32]),
}

impl WideStr<'_> {
    pub fn width(&self) -> WideWidth {
        match self {
            WideStr::Utf16(_) => WideWidth::Utf16,
            WideStr::Utf32(_) => WideWidth::Utf32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WideStr::Utf16(units) => units.len(),
            WideStr::Utf32(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_wide_string(&self) -> WideString {
        match *self {
            WideStr::Utf16(units) => WideString::from_units16(units),
            WideStr::Utf32(units) => WideString::from_units32(units),
        }
    }
}

/// Conversion to UTF-8 bytes. Narrow inputs are assumed to be UTF-8 already.
pub trait ToUtf8 {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError>;
}

impl ToUtf8 for [u8] {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        Ok(self.to_vec())
    }
}

impl ToUtf8 for Vec<u8> {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        self.as_slice().to_utf8()
    }
}

impl ToUtf8 for str {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        self.as_bytes().to_utf8()
    }
}

impl ToUtf8 for String {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        self.as_bytes().to_utf8()
    }
}

impl ToUtf8 for WideStr<'_> {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        match *self {
            WideStr::Utf16(units) => Ok(utf8_from_utf32(&utf32_from_utf16(units, false)?)),
            WideStr::Utf32(units) => Ok(utf8_from_utf32(units)),
        }
    }
}

impl ToUtf8 for WideString {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        self.as_wide_str().to_utf8()
    }
}

/// A missing string converts to an empty one.
impl<T: ToUtf8 + ?Sized> ToUtf8 for Option<&T> {
    fn to_utf8(&self) -> Result<Vec<u8>, ConvertError> {
        match self {
            Some(value) => value.to_utf8(),
            None => Ok(Vec::new()),
        }
    }
}

/// Conversion from UTF-8 to a wide string of the requested width. Wide inputs
/// are returned unchanged whatever their width.
pub trait FromUtf8 {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError>;
}

impl FromUtf8 for [u8] {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError> {
        let codepoints = utf32_from_utf8(self)?;
        trace!(bytes = self.len(), codepoints = codepoints.len(), bits = width.bits(), "widening UTF-8");
        Ok(match width {
            WideWidth::Utf16 => WideString::Utf16(utf16_from_utf32(&codepoints, false)),
            WideWidth::Utf32 => WideString::Utf32(codepoints),
        })
    }
}

impl FromUtf8 for Vec<u8> {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError> {
        self.as_slice().from_utf8(width)
    }
}

impl FromUtf8 for str {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError> {
        self.as_bytes().from_utf8(width)
    }
}

impl FromUtf8 for String {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError> {
        self.as_bytes().from_utf8(width)
    }
}

impl FromUtf8 for WideStr<'_> {
    fn from_utf8(&self, _width: WideWidth) -> Result<WideString, ConvertError> {
        Ok(self.to_wide_string())
    }
}

impl FromUtf8 for WideString {
    fn from_utf8(&self, _width: WideWidth) -> Result<WideString, ConvertError> {
        Ok(self.clone())
    }
}

impl<T: FromUtf8 + ?Sized> FromUtf8 for Option<&T> {
    fn from_utf8(&self, width: WideWidth) -> Result<WideString, ConvertError> {
        match self {
            Some(value) => value.from_utf8(width),
            None => Ok(WideString::new(width)),
        }
    }
}

/// Converts strings for one configured wide-string width.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcoder {
    width: WideWidth,
}

impl Transcoder {
    pub const fn new(width: WideWidth) -> Self {
        Self { width }
    }

    pub const fn native() -> Self {
        Self::new(WideWidth::native())
    }

    pub const fn width(&self) -> WideWidth {
        self.width
    }

    pub fn to_utf8<S: ToUtf8 + ?Sized>(&self, input: &S) -> Result<Vec<u8>, ConvertError> {
        input.to_utf8()
    }

    pub fn from_utf8<S: FromUtf8 + ?Sized>(&self, input: &S) -> Result<WideString, ConvertError> {
        input.from_utf8(self.width)
    }

    /// Wide string built from code points, encoding surrogate pairs for 16-bit width.
    pub fn wide_from_utf32(&self, codepoints: &[u32]) -> WideString {
        match self.width {
            WideWidth::Utf16 => WideString::Utf16(utf16_from_utf32(codepoints, false)),
            WideWidth::Utf32 => WideString::from_units32(codepoints),
        }
    }
}
