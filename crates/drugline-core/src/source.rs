//! Input loading: whole file into memory, gzip decoded when detected,
//! then transcoded to UTF-8 according to the document's own encoding.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::encoding::{EncodingError, decode, detect_encoding};
use quick_xml::events::Event;

use crate::error::ConvertError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `bytes` start with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decode a raw XML document to UTF-8 text.
///
/// A byte order mark wins, then the `encoding` named in the XML declaration,
/// then UTF-8.
pub fn decode_xml(bytes: &[u8]) -> Result<Cow<'_, str>, String> {
    if let Some((encoding, bom)) = detect_encoding(bytes) {
        if bom > 0 || encoding.name() != "UTF-8" {
            return decode(&bytes[bom..], encoding).map_err(|e| e.to_string());
        }
    }

    let mut reader = Reader::from_reader(bytes);
    if let Ok(Event::Decl(decl)) = reader.read_event() {
        match (decl.encoder(), decl.encoding()) {
            (Some(encoding), _) => return decode(bytes, encoding).map_err(|e| e.to_string()),
            (None, Some(label)) => {
                let label = label.map_err(|e| e.to_string())?;
                return Err(format!(
                    "unsupported encoding '{}'",
                    String::from_utf8_lossy(&label)
                ));
            }
            (None, None) => {}
        }
    }

    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| EncodingError::from(e).to_string())
}

/// Read the whole input document as UTF-8 text.
///
/// Gzip is detected from the magic bytes, not the file extension, so
/// `drugbank.xml.gz` and a renamed dump both work. Bytes that do not decode
/// in the document's encoding are a [`ConvertError::Parse`].
pub fn read_input(path: &Path) -> Result<String, ConvertError> {
    let read_err = |source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(read_err)?;

    let bytes = if is_gzip(&bytes) {
        log::debug!("{}: gzip input, decompressing", path.display());
        let mut decoded = Vec::with_capacity(bytes.len() * 4);
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decoded)
            .map_err(read_err)?;
        decoded
    } else {
        bytes
    };

    let text = decode_xml(&bytes).map_err(|message| ConvertError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(text.into_owned())
}
