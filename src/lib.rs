pub mod utf;
pub mod wide;

use std::ffi::OsString;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

pub use utf::utf16sequence::{utf16_from_utf32, utf32_from_utf16, Utf16Decoder, Utf16Encoder};
pub use utf::utf8sequence::{sequence_len, utf32_from_utf8, utf8_from_utf32, Utf8Decoder, Utf8Encoder};
pub use utf::{decode_body, decode_buffer, detect_bom, Bom, ConvertError, Decoded, ErrorKind};
pub use wide::{FromUtf8, ToUtf8, Transcoder, WideStr, WideString, WideWidth};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reports the encoding and length of each file in `argv`.
pub fn transcode(argv: Vec<OsString>) -> Result<(), TranscodeError> {
    if argv.is_empty() {
        match std::env::current_exe() {
            Ok(exe) => eprintln!("Not enough arguments. Usage: {} [files]", exe.display()),
            Err(_) => eprintln!("Not enough arguments. Usage: transcode [files]"),
        }
        return Err(std::io::Error::from(std::io::ErrorKind::InvalidInput).into());
    }
    for argument in argv.iter() {
        print!("{}: ", argument.to_string_lossy());
        match std::fs::read(Path::new(argument)) {
            Ok(contents) => println!("{}", classify_file(&contents)),
            Err(error) => println!("{error}"),
        }
    }
    Ok(())
}

enum FileClassifications {
    Empty,
    Text { bom: Bom, characters: usize },
    Invalid { bom: Bom, error: ConvertError },
}

impl std::fmt::Display for FileClassifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileClassifications::Empty => write!(f, "empty"),
            FileClassifications::Text { bom, characters } => {
                write!(f, "{} text, {characters} characters", encoding_name(*bom))
            }
            FileClassifications::Invalid { bom, error } => {
                write!(f, "invalid {} data ({error})", encoding_name(*bom))
            }
        }
    }
}

fn encoding_name(bom: Bom) -> &'static str {
    match bom {
        Bom::None => "UTF-8 Unicode",
        Bom::Utf8 => "UTF-8 Unicode (with BOM)",
        Bom::Utf16Le => "UTF-16 little-endian Unicode",
        Bom::Utf16Be => "UTF-16 big-endian Unicode",
    }
}

fn classify_file(file: &[u8]) -> FileClassifications {
    if file.is_empty() {
        return FileClassifications::Empty;
    }
    let (bom, body) = Bom::strip(file);
    debug!(?bom, bytes = file.len(), "classifying buffer");
    match decode_body(bom, body) {
        Ok(codepoints) => FileClassifications::Text {
            bom,
            characters: codepoints.len(),
        },
        Err(error) => FileClassifications::Invalid { bom, error },
    }
}
