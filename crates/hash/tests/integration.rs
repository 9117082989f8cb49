//! Integration tests for the hash crate

use pkgqa_hash::Digest;
use tempfile::tempdir;
use tokio::fs;

#[tokio::test]
async fn test_hash_file_matches_from_data() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("test.txt");

    let data = b"digest this content";
    fs::write(&file_path, data).await.unwrap();

    let from_file = Digest::hash_file(&file_path).await.unwrap();
    let from_data = Digest::from_data(data);
    assert_eq!(from_file, from_data);
}

#[tokio::test]
async fn test_hash_file_missing() {
    let dir = tempdir().unwrap();
    let result = Digest::hash_file(&dir.path().join("missing")).await;
    assert!(result.is_err());
}

#[test]
fn test_hex_round_trip() {
    let digest = Digest::from_data(b"round trip");
    let hex = digest.to_hex();
    assert_eq!(hex.len(), 64);

    let parsed = Digest::from_hex(&hex).unwrap();
    assert_eq!(digest, parsed);
    assert_eq!(digest.to_string(), hex);
}

#[test]
fn test_from_hex_errors() {
    // Too short
    assert!(Digest::from_hex("1234").is_err());

    // Too long
    assert!(Digest::from_hex(&"a".repeat(66)).is_err());

    // Invalid hex
    assert!(Digest::from_hex("xyz123").is_err());
}

#[test]
fn test_identical_content_identical_digest() {
    let a = Digest::from_data(b"#!/bin/sh\necho hello\n");
    let b = Digest::from_data(b"#!/bin/sh\necho hello\n");
    let c = Digest::from_data(b"#!/bin/sh\necho other\n");

    assert_eq!(a, b);
    assert_ne!(a, c);
}
