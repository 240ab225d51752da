use super::*;
use crate::error::UploadError;
use serde_json::json;

fn staging() -> UploadStaging {
    UploadStaging::new(LocalStore::temporary().unwrap())
}

fn notebook_json(language: &str) -> String {
    json!({
        "cells": [{ "cell_type": "code", "source": "x <- 1", "metadata": {} }],
        "metadata": { "kernelspec": { "language": language, "name": "whatever" } },
        "nbformat": 4,
        "nbformat_minor": 5
    })
    .to_string()
}

#[test]
fn test_stage_and_get() {
    let staging = staging();
    let id = staging.stage(&notebook_json("R")).unwrap();

    let doc = staging.get(&id).unwrap().unwrap();
    assert_eq!(doc.cells.len(), 1);
    assert!(staging.store.contains("uploads", &format!("uploaded-notebook:{}", id)).unwrap());
}

#[test]
fn test_each_upload_gets_its_own_id() {
    let staging = staging();
    let a = staging.stage(&notebook_json("python")).unwrap();
    let b = staging.stage(&notebook_json("python")).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_language_from_language_info() {
    let raw = json!({
        "cells": [],
        "metadata": { "language_info": { "name": "python" } },
        "nbformat": 4,
        "nbformat_minor": 5
    })
    .to_string();
    assert!(staging().stage(&raw).is_ok());
}

#[test]
fn test_rejects_other_languages() {
    let err = staging().stage(&notebook_json("julia")).unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedLanguage));
}

#[test]
fn test_rejects_invalid_json() {
    let err = staging().stage("{ not a notebook").unwrap_err();
    assert!(matches!(err, UploadError::Parse(_)));
}

#[test]
fn test_remove_clears_entry() {
    let staging = staging();
    let id = staging.stage(&notebook_json("python")).unwrap();

    staging.remove(&id).unwrap();

    assert!(staging.get(&id).unwrap().is_none());
    // removing twice is fine
    staging.remove(&id).unwrap();
}

#[test]
fn test_unknown_id_is_none() {
    assert!(staging().get("no-such-upload").unwrap().is_none());
}
