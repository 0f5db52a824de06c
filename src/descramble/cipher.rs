// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Byte-level page ciphers.
//!
//! Two schemes exist in the wild, both with per-page key material delivered
//! as hex strings in the chapter metadata:
//!
//! - **AES-128-CBC** with PKCS#7 padding, 16-byte key and IV. The whole
//!   encoded image is one ciphertext; decryption happens before any raster
//!   work.
//! - **Repeating-key XOR**: an 8-byte keystream taken from the page's DRM
//!   hash, cycled over the encoded image bytes. Applying it twice is the
//!   identity, so the same routine en- and decrypts.
//!
//! Key material is decoded into [`Zeroizing`] buffers so page keys do not
//! linger on the heap after the page is done.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use zeroize::Zeroizing;

use super::error::{DescrambleError, Result};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES-CBC key/IV length in bytes.
const AES_LEN: usize = 16;
/// XOR keystream length in bytes (the first 8 hash bytes).
const XOR_KEY_LEN: usize = 8;

/// Decode a hex string into exactly `len` bytes.
fn decode_hex(raw: &str, len: usize, what: &'static str) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = hex::decode(raw.trim()).map_err(|_| DescrambleError::InvalidKeyMaterial(what))?;
    if bytes.len() != len {
        return Err(DescrambleError::InvalidKeyMaterial(what));
    }
    Ok(Zeroizing::new(bytes))
}

/// Decode a hex string and keep the first `len` bytes (DRM hashes are
/// longer than the keystream they seed).
fn decode_hex_prefix(raw: &str, len: usize, what: &'static str) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = hex::decode(raw.trim()).map_err(|_| DescrambleError::InvalidKeyMaterial(what))?;
    if bytes.len() < len {
        return Err(DescrambleError::InvalidKeyMaterial(what));
    }
    let mut out = Zeroizing::new(bytes);
    out.truncate(len);
    Ok(out)
}

/// Decrypt an AES-128-CBC page.
///
/// # Errors
/// [`DescrambleError::InvalidKeyMaterial`] if key or IV is not 16 hex-coded
/// bytes; [`DescrambleError::CipherFailed`] on bad padding (wrong key or
/// truncated download).
pub fn decrypt_aes_cbc(data: &[u8], key_hex: &str, iv_hex: &str) -> Result<Vec<u8>> {
    let key = decode_hex(key_hex, AES_LEN, "AES key")?;
    let iv = decode_hex(iv_hex, AES_LEN, "AES IV")?;

    let dec = Aes128CbcDec::new_from_slices(&key, &iv)
        .map_err(|_| DescrambleError::InvalidKeyMaterial("AES key/IV length"))?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| DescrambleError::CipherFailed)
}

/// Apply the repeating-key XOR keystream derived from a DRM hash.
///
/// The keystream is the first 8 bytes of the hex-decoded hash; XOR is an
/// involution, so this both encrypts and decrypts.
///
/// # Errors
/// [`DescrambleError::InvalidKeyMaterial`] if the hash holds fewer than
/// 8 hex-coded bytes.
pub fn xor_keystream(data: &[u8], drm_hash_hex: &str) -> Result<Vec<u8>> {
    let key = decode_hex_prefix(drm_hash_hex, XOR_KEY_LEN, "DRM hash")?;
    Ok(data
        .iter()
        .enumerate()
        .map(|(i, &b)| b ^ key[i % XOR_KEY_LEN])
        .collect())
}
