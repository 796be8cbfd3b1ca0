//! Envelope format of the config descriptor file.
//!
//! The layout is header-first so the KDF parameters can be read before the
//! outer key exists (little-endian where numeric):
//!
//! ```text
//! ASCII magic "cryfs.config;1;"
//! u32 kdf_parameters_length
//! kdf_parameters_length bytes of KDF parameters (opaque to the envelope)
//! AEAD ciphertext (nonce || ciphertext || tag) of the encoded payload
//! ```
//!
//! The header is not part of the ciphertext but is bound to it as AEAD
//! associated data, so tampering with the stored KDF parameters makes
//! decryption fail just like tampering with the ciphertext itself.

use anyhow::{Context, Result};
use binrw::{BinRead, BinWrite, binrw};
use std::io::Cursor;
use thiserror::Error;
use zeroize::Zeroizing;

use cloakfs_crypto::symmetric::{Cipher, CipherDef, EncryptionKey, XChaCha20Poly1305};

/// The cipher encrypting the descriptor payload. This is fixed; the cipher
/// named in the descriptor only applies to the block layer.
pub type OuterCipher = XChaCha20Poly1305;

pub const OUTER_KEY_SIZE: usize = OuterCipher::KEY_SIZE;

/// Cleartext header of the envelope. Everything after it is ciphertext.
/// A declared KDF parameter length pointing beyond the end of the file fails
/// the read.
#[binrw]
#[brw(little, magic = b"cryfs.config;1;")]
struct EnvelopeHeader {
    #[br(temp)]
    #[bw(try_calc = u32::try_from(kdf_parameters.len()))]
    kdf_parameters_len: u32,

    #[br(count = kdf_parameters_len)]
    kdf_parameters: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum MalformedEnvelopeError {
    #[error("Config file doesn't start with the expected magic bytes")]
    WrongMagic,

    #[error("Config file envelope is malformed: {0}")]
    ParseError(binrw::Error),
}

#[derive(Error, Debug)]
#[error("Decrypting the config file failed")]
pub struct DecryptionFailedError;

/// The sections of an envelope file.
pub struct ParsedEnvelope<'a> {
    pub kdf_parameters: Vec<u8>,
    associated_data: &'a [u8],
    ciphertext: &'a [u8],
}

pub fn parse(file_content: &[u8]) -> Result<ParsedEnvelope<'_>, MalformedEnvelopeError> {
    let mut cursor = Cursor::new(file_content);
    let header = EnvelopeHeader::read(&mut cursor).map_err(|err| match err.root_cause() {
        binrw::Error::BadMagic { .. } => MalformedEnvelopeError::WrongMagic,
        _ => MalformedEnvelopeError::ParseError(err),
    })?;
    let header_len =
        usize::try_from(cursor.position()).expect("Cursor position can't exceed the buffer size");
    Ok(ParsedEnvelope {
        kdf_parameters: header.kdf_parameters,
        associated_data: &file_content[..header_len],
        ciphertext: &file_content[header_len..],
    })
}

pub fn encrypt(
    payload: &[u8],
    outer_key: &EncryptionKey,
    kdf_parameters: &[u8],
) -> Result<Vec<u8>> {
    let header = EnvelopeHeader {
        kdf_parameters: kdf_parameters.to_vec(),
    };
    let mut file_content = Cursor::new(Vec::new());
    header
        .write(&mut file_content)
        .context("Tried to serialize the envelope header")?;
    let mut file_content = file_content.into_inner();
    // The serialized header doubles as the associated data
    let ciphertext = OuterCipher::new(outer_key.clone())?.encrypt(payload, &file_content)?;
    file_content.extend_from_slice(&ciphertext);
    Ok(file_content)
}

pub fn decrypt(
    envelope: &ParsedEnvelope<'_>,
    outer_key: &EncryptionKey,
) -> Result<Zeroizing<Vec<u8>>, DecryptionFailedError> {
    // Any failure (wrong key, tampered ciphertext, tampered header) collapses
    // into the one opaque error so callers can't distinguish a wrong password
    // from a corrupted file.
    let cipher = OuterCipher::new(outer_key.clone()).map_err(|_| DecryptionFailedError)?;
    let payload = cipher
        .decrypt(envelope.ciphertext, envelope.associated_data)
        .map_err(|_| DecryptionFailedError)?;
    Ok(Zeroizing::new(payload))
}
