// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn key() -> UnsealKey {
    UnsealKey::from_bytes([7u8; KEY_LEN])
}

#[test]
fn seal_then_unseal_recovers_plaintext() {
    let script = b"import pandas as pd\nprint('training')\n";
    let blob = seal(script, &key()).unwrap();

    assert_eq!(blob.len(), IV_LEN + TAG_LEN + script.len());
    assert_eq!(unseal(&blob, &key()).unwrap(), script);
}

#[test]
fn fresh_iv_per_seal() {
    let a = seal(b"same", &key()).unwrap();
    let b = seal(b"same", &key()).unwrap();
    assert_ne!(a[..IV_LEN], b[..IV_LEN]);
}

#[test]
fn wrong_key_fails_authentication() {
    let blob = seal(b"secret", &key()).unwrap();
    let other = UnsealKey::from_bytes([8u8; KEY_LEN]);

    assert!(matches!(unseal(&blob, &other), Err(UnsealError::Authentication)));
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let mut blob = seal(b"secret script", &key()).unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x01;

    assert!(matches!(unseal(&blob, &key()), Err(UnsealError::Authentication)));
}

#[parameterized(
    empty = { 0 },
    iv_only = { 16 },
    one_short = { 31 },
)]
fn short_blob_is_truncated(len: usize) {
    let blob = vec![0u8; len];
    assert!(matches!(unseal(&blob, &key()), Err(UnsealError::Truncated(n)) if n == len));
}

#[test]
fn empty_plaintext_round_trips() {
    let blob = seal(b"", &key()).unwrap();
    assert_eq!(blob.len(), IV_LEN + TAG_LEN);
    assert!(unseal(&blob, &key()).unwrap().is_empty());
}

#[parameterized(
    raw_32 = { "0123456789abcdef0123456789abcdef", true },
    hex_64 = { "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f", true },
    too_short = { "short", false },
    hex_63 = { "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1", false },
    empty = { "", false },
    padded_raw_32 = { " 0123456789abcdef0123456789abcd ", true },
    padded_hex_64 = { " 000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f", false },
)]
fn key_parsing(raw: &str, ok: bool) {
    let result = UnsealKey::from_secret(&SecretString::from(raw.to_string()));
    assert_eq!(result.is_ok(), ok);
}

#[test]
fn hex_key_decodes_to_bytes() {
    let hex_key = "07".repeat(KEY_LEN);
    let from_hex = UnsealKey::from_secret(&SecretString::from(hex_key)).unwrap();
    let blob = seal(b"payload", &key()).unwrap();

    assert_eq!(unseal(&blob, &from_hex).unwrap(), b"payload");
}

#[test]
fn surrounding_spaces_are_key_bytes() {
    let raw = " 0123456789abcdef0123456789abcd ";
    let padded = UnsealKey::from_secret(&SecretString::from(raw.to_string())).unwrap();
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(raw.as_bytes());
    let blob = seal(b"payload", &UnsealKey::from_bytes(bytes)).unwrap();

    assert_eq!(unseal(&blob, &padded).unwrap(), b"payload");
}

#[test]
fn error_messages_name_expected_lengths() {
    assert_eq!(
        UnsealError::InvalidKey(5).to_string(),
        "encryption key must be 32 bytes (or 64 hex chars), got 5 bytes"
    );
    assert_eq!(
        UnsealError::Truncated(4).to_string(),
        "blob too short: 4 bytes, need at least 32"
    );
}

#[test]
fn key_debug_is_redacted() {
    assert_eq!(format!("{:?}", key()), "UnsealKey([REDACTED])");
}

#[test]
fn integrity_check() {
    let plaintext = b"abc";
    let good = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    assert_eq!(sha256_hex(plaintext), good);
    assert!(verify_integrity(plaintext, Some(good)).is_ok());
    assert!(verify_integrity(plaintext, Some(&good.to_uppercase())).is_ok());
    assert!(verify_integrity(plaintext, None).is_ok());
    assert!(matches!(
        verify_integrity(b"abd", Some(good)),
        Err(UnsealError::Integrity { .. })
    ));
}
