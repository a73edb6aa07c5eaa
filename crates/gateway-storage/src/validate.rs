//! Content validation applied to uploads before they reach object storage.

use flate2::read::GzDecoder;
use gateway_error::{ErrorCode, GatewayError};
use std::io::Read;

/// Confirms `bytes` opens as a gzip stream whose first tar entry has a
/// readable header. Only the first entry is inspected — this is a format
/// sniff, not a full-archive validation.
pub fn looks_like_gzip_tar(bytes: &[u8]) -> Result<(), GatewayError> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    let mut entries = archive
        .entries()
        .map_err(|_| GatewayError::code(ErrorCode::FileNotArchive))?;
    match entries.next() {
        Some(Ok(_)) => Ok(()),
        _ => Err(GatewayError::code(ErrorCode::FileNotArchive)),
    }
}

/// Confirms `bytes` is valid UTF-8 JSON and that its top-level value is an
/// object, matching the config-file shape the scheduler expects.
pub fn validate_json_object(bytes: &[u8]) -> Result<serde_json::Value, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| GatewayError::code(ErrorCode::JsonFileIsInvalid))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(GatewayError::code(ErrorCode::JsonFileIsInvalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_gzip_tar(entry_name: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, entry_name, contents)
            .unwrap();
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn accepts_a_real_gzip_tar() {
        let archive = make_gzip_tar("fuzzer_binary", b"ELF...");
        assert!(looks_like_gzip_tar(&archive).is_ok());
    }

    #[test]
    fn rejects_plain_bytes() {
        let err = looks_like_gzip_tar(b"not an archive at all").unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_FILE_NOT_ARCHIVE");
    }

    #[test]
    fn accepts_a_json_object() {
        let value = validate_json_object(br#"{"threads": 4}"#).unwrap();
        assert!(value.is_object());
    }

    #[test]
    fn rejects_a_json_array() {
        let err = validate_json_object(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_JSON_FILE_IS_INVALID");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = validate_json_object(b"not json").unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_JSON_FILE_IS_INVALID");
    }
}
