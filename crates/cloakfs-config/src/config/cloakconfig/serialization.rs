//! Codec for the cleartext descriptor payload.
//!
//! The encoded form is a binary frame around a self-describing key/value
//! payload: an ASCII header identifying the payload format version, a
//! little-endian `u32` payload length, and the payload itself as a JSON
//! object with one key per descriptor field. Decoding is strict so that a
//! corrupted or foreign payload is detected instead of silently accepted:
//! unknown keys, missing or empty required keys, and any mismatch between
//! the declared and actual payload size all fail.

use binrw::{BinRead, BinWrite, binrw};
use std::io::Cursor;
use thiserror::Error;

use super::cloakconfig::CloakConfig;

const KNOWN_FIELDS: &[&str] = &[
    "root_blob",
    "enc_key",
    "cipher",
    "format_version",
    "created_with_version",
    "last_opened_with_version",
    "blocksize_bytes",
    "filesystem_id",
    "exclusive_client_id",
];

// All fields except `exclusive_client_id`, which is the only optional one.
const REQUIRED_FIELDS: &[&str] = &[
    "root_blob",
    "enc_key",
    "cipher",
    "format_version",
    "created_with_version",
    "last_opened_with_version",
    "blocksize_bytes",
    "filesystem_id",
];

// Required string fields additionally must be non-empty.
const NONEMPTY_FIELDS: &[&str] = &[
    "root_blob",
    "enc_key",
    "cipher",
    "format_version",
    "created_with_version",
    "last_opened_with_version",
];

/// Binary frame around the JSON payload. A declared payload length pointing
/// beyond the end of the buffer fails the read; trailing bytes after the
/// payload are rejected separately in [`deserialize`].
#[binrw]
#[brw(little, magic = b"cryfs.config.inner;1;")]
struct SerializedConfig {
    #[br(temp)]
    #[bw(try_calc = u32::try_from(payload.len()))]
    payload_len: u32,

    #[br(count = payload_len)]
    payload: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum DeserializationError {
    #[error("Serialized config doesn't start with the expected header")]
    WrongHeader,

    #[error("Serialized config frame is malformed: {0}")]
    InvalidFrame(binrw::Error),

    #[error("Serialized config has {num_trailing_bytes} trailing bytes after the declared payload")]
    TrailingData { num_trailing_bytes: usize },

    #[error("Serialized config payload must be a key-value object")]
    NotAnObject,

    #[error("Unknown field `{field}` in serialized config")]
    UnknownField { field: String },

    #[error("Missing field `{field}` in serialized config")]
    MissingField { field: &'static str },

    #[error("Invalid value in serialized config: {0}")]
    InvalidValue(#[from] serde_json::Error),
}

pub fn serialize(config: &CloakConfig) -> Vec<u8> {
    let payload = serde_json::to_vec(config).expect("Serializing the config can't fail");
    let mut result = Cursor::new(Vec::new());
    SerializedConfig { payload }
        .write(&mut result)
        .expect("Writing can't fail, the config payload is always smaller than 4GB");
    result.into_inner()
}

pub fn deserialize(data: &[u8]) -> Result<CloakConfig, DeserializationError> {
    let mut cursor = Cursor::new(data);
    let frame = SerializedConfig::read(&mut cursor).map_err(|err| match err.root_cause() {
        binrw::Error::BadMagic { .. } => DeserializationError::WrongHeader,
        _ => DeserializationError::InvalidFrame(err),
    })?;
    let num_trailing_bytes = data.len()
        - usize::try_from(cursor.position()).expect("Cursor position can't exceed the buffer size");
    if num_trailing_bytes > 0 {
        return Err(DeserializationError::TrailingData { num_trailing_bytes });
    }

    let value: serde_json::Value = serde_json::from_slice(&frame.payload)?;
    let fields = value
        .as_object()
        .ok_or(DeserializationError::NotAnObject)?;
    for field in fields.keys() {
        if !KNOWN_FIELDS.contains(&field.as_str()) {
            return Err(DeserializationError::UnknownField {
                field: field.clone(),
            });
        }
    }
    for field in REQUIRED_FIELDS {
        if !fields.contains_key(*field) {
            return Err(DeserializationError::MissingField { field });
        }
    }
    for field in NONEMPTY_FIELDS {
        if fields[*field].as_str() == Some("") {
            return Err(DeserializationError::MissingField { field });
        }
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::super::filesystem_id::FilesystemId;
    use super::*;

    fn example_config() -> CloakConfig {
        CloakConfig {
            root_blob: "a5f3b6c2d4e19087a5f3b6c2d4e19087".to_string(),
            enc_key: "0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF"
                .to_string(),
            cipher: "xchacha20-poly1305".to_string(),
            format_version: "0.10".to_string(),
            created_with_version: "0.11.0".to_string(),
            last_opened_with_version: "0.11.0".to_string(),
            blocksize_bytes: 16384,
            filesystem_id: FilesystemId::new_random(),
            exclusive_client_id: None,
        }
    }

    fn frame(payload: Vec<u8>) -> Vec<u8> {
        let mut result = Cursor::new(Vec::new());
        SerializedConfig { payload }.write(&mut result).unwrap();
        result.into_inner()
    }

    fn payload_of(serialized: &[u8]) -> Vec<u8> {
        SerializedConfig::read(&mut Cursor::new(serialized))
            .unwrap()
            .payload
    }

    // Modifies the JSON payload of a serialized config with `f` and reframes
    // it with a correct header and length, so tests can build invalid payloads.
    fn with_modified_payload(
        config: &CloakConfig,
        f: impl FnOnce(&mut serde_json::Map<String, serde_json::Value>),
    ) -> Vec<u8> {
        let payload = payload_of(&serialize(config));
        let mut value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        f(value.as_object_mut().unwrap());
        frame(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn roundtrip() {
        let config = example_config();
        let deserialized = deserialize(&serialize(&config)).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn roundtrip_with_exclusive_client_id() {
        let config = CloakConfig {
            exclusive_client_id: Some(0x12345678),
            ..example_config()
        };
        let deserialized = deserialize(&serialize(&config)).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn missing_exclusive_client_id_is_allowed() {
        let serialized = with_modified_payload(&example_config(), |fields| {
            fields.remove("exclusive_client_id");
        });
        let deserialized = deserialize(&serialized).unwrap();
        assert_eq!(None, deserialized.exclusive_client_id);
    }

    #[test]
    fn wrong_header() {
        let mut serialized = serialize(&example_config());
        serialized[0] ^= 0x01;
        assert!(matches!(
            deserialize(&serialized),
            Err(DeserializationError::WrongHeader)
        ));
    }

    #[test]
    fn truncated_frame() {
        let serialized = serialize(&example_config());
        // Cut off in the middle of the header
        assert!(deserialize(&serialized[..4]).is_err());
        // Cut off in the middle of the payload, i.e. the declared payload
        // size reaches beyond the end of the buffer
        assert!(matches!(
            deserialize(&serialized[..serialized.len() - 1]),
            Err(DeserializationError::InvalidFrame(_))
        ));
    }

    #[test]
    fn trailing_data() {
        let mut serialized = serialize(&example_config());
        serialized.push(b'x');
        assert!(matches!(
            deserialize(&serialized),
            Err(DeserializationError::TrailingData {
                num_trailing_bytes: 1
            })
        ));
    }

    #[test]
    fn unknown_field() {
        let serialized = with_modified_payload(&example_config(), |fields| {
            fields.insert("future_field".to_string(), serde_json::json!(42));
        });
        match deserialize(&serialized).unwrap_err() {
            DeserializationError::UnknownField { field } => assert_eq!("future_field", field),
            err => panic!("Expected UnknownField, got {err:?}"),
        }
    }

    #[test]
    fn missing_field() {
        let serialized = with_modified_payload(&example_config(), |fields| {
            fields.remove("enc_key");
        });
        match deserialize(&serialized).unwrap_err() {
            DeserializationError::MissingField { field } => assert_eq!("enc_key", field),
            err => panic!("Expected MissingField, got {err:?}"),
        }
    }

    #[test]
    fn empty_required_field() {
        let serialized = with_modified_payload(&example_config(), |fields| {
            fields.insert("cipher".to_string(), serde_json::json!(""));
        });
        match deserialize(&serialized).unwrap_err() {
            DeserializationError::MissingField { field } => assert_eq!("cipher", field),
            err => panic!("Expected MissingField, got {err:?}"),
        }
    }

    #[test]
    fn invalid_field_value() {
        let serialized = with_modified_payload(&example_config(), |fields| {
            fields.insert("blocksize_bytes".to_string(), serde_json::json!("not a number"));
        });
        assert!(matches!(
            deserialize(&serialized),
            Err(DeserializationError::InvalidValue(_))
        ));
    }

    #[test]
    fn payload_that_is_not_an_object() {
        let serialized = frame(b"[1,2,3]".to_vec());
        assert!(matches!(
            deserialize(&serialized),
            Err(DeserializationError::NotAnObject)
        ));
    }
}
