//! Ordered request shapes for file-backed job responses.
//!
//! The marketplace does not document which body it accepts for a FILE
//! response, so the client tries a fixed list of plausible shapes and ends
//! with a plain TEXT response that always exists.

use serde_json::{Map, Value, json};

use super::types::scalar_to_string;

/// Keys that may hold a usable reference to an uploaded file, in priority order.
pub const REFERENCE_KEYS: [&str; 8] = [
    "url",
    "fileUrl",
    "cdnUrl",
    "signedUrl",
    "path",
    "key",
    "id",
    "fileId",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseAttempt {
    /// `{responseType: FILE, files: [descriptor, ...]}`
    FileList(Vec<Value>),
    /// `{responseType: FILE, file: descriptor}`
    SingleFile(Value),
    Content(String),
    FileUrl(String),
    Url(String),
    Attachments(String),
    UrlFiles(String),
    /// `{responseType: TEXT, content}`; always the last attempt.
    Text(String),
}

impl ResponseAttempt {
    pub fn shape(&self) -> &'static str {
        match self {
            ResponseAttempt::FileList(_) => "files",
            ResponseAttempt::SingleFile(_) => "file",
            ResponseAttempt::Content(_) => "content",
            ResponseAttempt::FileUrl(_) => "fileUrl",
            ResponseAttempt::Url(_) => "url",
            ResponseAttempt::Attachments(_) => "attachments",
            ResponseAttempt::UrlFiles(_) => "files[url]",
            ResponseAttempt::Text(_) => "text",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ResponseAttempt::FileList(files) => json!({ "responseType": "FILE", "files": files }),
            ResponseAttempt::SingleFile(file) => json!({ "responseType": "FILE", "file": file }),
            ResponseAttempt::Content(r) => json!({ "responseType": "FILE", "content": r }),
            ResponseAttempt::FileUrl(r) => json!({ "responseType": "FILE", "fileUrl": r }),
            ResponseAttempt::Url(r) => json!({ "responseType": "FILE", "url": r }),
            ResponseAttempt::Attachments(r) => json!({ "responseType": "FILE", "attachments": [r] }),
            ResponseAttempt::UrlFiles(r) => {
                json!({ "responseType": "FILE", "files": [{ "url": r }] })
            }
            ResponseAttempt::Text(content) => json!({ "responseType": "TEXT", "content": content }),
        }
    }
}

/// File descriptors from an upload result: the `files` list if present,
/// else the single `file` object, else nothing.
pub fn extract_file_candidates(upload_result: &Value) -> Vec<Value> {
    if let Some(files) = upload_result.get("files").and_then(Value::as_array) {
        return files.iter().filter(|item| item.is_object()).cloned().collect();
    }
    match upload_result.get("file") {
        Some(file) if file.is_object() => vec![file.clone()],
        _ => Vec::new(),
    }
}

/// Reference strings, top level first, then each descriptor; first-seen order, no duplicates.
pub fn extract_reference_strings(upload_result: &Value) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut scan = |object: &Map<String, Value>| {
        for key in REFERENCE_KEYS {
            let Some(value) = object.get(key) else {
                continue;
            };
            let text = scalar_to_string(value).trim().to_string();
            if !text.is_empty() && !refs.contains(&text) {
                refs.push(text);
            }
        }
    };

    if let Some(top) = upload_result.as_object() {
        scan(top);
    }
    for item in extract_file_candidates(upload_result) {
        if let Some(object) = item.as_object() {
            scan(object);
        }
    }
    refs
}

pub fn build_attempts(upload_result: &Value, fallback_text: &str) -> Vec<ResponseAttempt> {
    let files = extract_file_candidates(upload_result);
    let refs = extract_reference_strings(upload_result);

    let mut attempts = Vec::with_capacity(2 + refs.len() * 5 + 1);
    if !files.is_empty() {
        let single = (files.len() == 1).then(|| files[0].clone());
        attempts.push(ResponseAttempt::FileList(files));
        if let Some(file) = single {
            attempts.push(ResponseAttempt::SingleFile(file));
        }
    }

    for r in refs {
        attempts.push(ResponseAttempt::Content(r.clone()));
        attempts.push(ResponseAttempt::FileUrl(r.clone()));
        attempts.push(ResponseAttempt::Url(r.clone()));
        attempts.push(ResponseAttempt::Attachments(r.clone()));
        attempts.push(ResponseAttempt::UrlFiles(r));
    }

    attempts.push(ResponseAttempt::Text(fallback_text.to_string()));
    attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_list_wins_over_single_file() {
        let upload = json!({
            "files": [{ "url": "a" }, "not-an-object", { "url": "b" }],
            "file": { "url": "c" }
        });
        assert_eq!(
            extract_file_candidates(&upload),
            vec![json!({ "url": "a" }), json!({ "url": "b" })]
        );
    }

    #[test]
    fn single_file_object_is_used_when_no_list() {
        let upload = json!({ "file": { "id": 7 } });
        assert_eq!(extract_file_candidates(&upload), vec![json!({ "id": 7 })]);
        assert!(extract_file_candidates(&json!({ "file": "x" })).is_empty());
        assert!(extract_file_candidates(&json!([1, 2])).is_empty());
    }

    #[test]
    fn references_follow_key_priority_and_dedupe() {
        let upload = json!({
            "id": "up-1",
            "url": "https://cdn/x.zip",
            "files": [
                { "fileId": 99, "url": "https://cdn/x.zip", "path": " /x.zip " },
                { "key": "", "signedUrl": null }
            ]
        });
        assert_eq!(
            extract_reference_strings(&upload),
            vec!["https://cdn/x.zip", "up-1", "/x.zip", "99"]
        );
    }

    #[test]
    fn attempts_for_single_descriptor() {
        let upload = json!({ "files": [{ "url": "https://cdn/f.zip" }] });
        let attempts = build_attempts(&upload, "answer");
        let shapes: Vec<&str> = attempts.iter().map(ResponseAttempt::shape).collect();
        assert_eq!(
            shapes,
            vec![
                "files",
                "file",
                "content",
                "fileUrl",
                "url",
                "attachments",
                "files[url]",
                "text"
            ]
        );
        assert_eq!(
            attempts[1].payload(),
            json!({ "responseType": "FILE", "file": { "url": "https://cdn/f.zip" } })
        );
        assert_eq!(
            attempts[5].payload(),
            json!({ "responseType": "FILE", "attachments": ["https://cdn/f.zip"] })
        );
        assert_eq!(
            attempts[6].payload(),
            json!({ "responseType": "FILE", "files": [{ "url": "https://cdn/f.zip" }] })
        );
        assert_eq!(
            attempts[7].payload(),
            json!({ "responseType": "TEXT", "content": "answer" })
        );
    }

    #[test]
    fn two_descriptors_skip_single_file_shape() {
        let upload = json!({ "files": [{ "name": "a" }, { "name": "b" }] });
        let attempts = build_attempts(&upload, "t");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].shape(), "files");
        assert_eq!(attempts[1], ResponseAttempt::Text("t".to_string()));
    }

    #[test]
    fn opaque_result_still_has_text_fallback() {
        let attempts = build_attempts(&json!({ "uploaded": true }), "fallback");
        assert_eq!(attempts, vec![ResponseAttempt::Text("fallback".to_string())]);
    }

    #[test]
    fn each_reference_gets_five_shapes() {
        let upload = json!({ "url": "u1", "key": "k1" });
        let attempts = build_attempts(&upload, "t");
        assert_eq!(attempts.len(), 11);
        assert_eq!(attempts[0], ResponseAttempt::Content("u1".to_string()));
        assert_eq!(attempts[5], ResponseAttempt::Content("k1".to_string()));
    }
}
