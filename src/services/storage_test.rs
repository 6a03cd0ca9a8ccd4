use super::*;

fn doc(id: &str, updated_at: &str) -> Document {
    Document {
        id: id.into(),
        title: format!("Doc {id}"),
        text: String::new(),
        tags: vec![],
        updated_at: updated_at.into(),
    }
}

#[tokio::test]
async fn save_without_id_creates() {
    let storage = MemoryStorage::new();
    let saved = storage
        .save(SaveRequest { id: None, title: "  ".into(), text: "```flow\n[a]\n```".into(), tags: vec![] })
        .await
        .unwrap();
    assert!(!saved.id.is_empty());
    assert_eq!(saved.title, "Untitled");
    assert!(!saved.updated_at.is_empty());

    let loaded = storage.load(&saved.id).await.unwrap();
    assert_eq!(loaded, saved);
}

#[tokio::test]
async fn save_with_id_upserts() {
    let storage = MemoryStorage::with_documents([doc("a", "2024-01-01T00:00:00Z")]);
    storage
        .save(SaveRequest { id: Some("a".into()), title: "Renamed".into(), text: "x".into(), tags: vec!["t".into()] })
        .await
        .unwrap();
    let list = storage.list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "Renamed");
    assert_eq!(list[0].tags, ["t"]);
    assert_eq!(storage.load("a").await.unwrap().text, "x");
}

#[tokio::test]
async fn list_is_newest_first() {
    let storage = MemoryStorage::with_documents([
        doc("old", "2024-01-01T00:00:00Z"),
        doc("new", "2024-03-01T00:00:00Z"),
        doc("mid", "2024-02-01T00:00:00Z"),
    ]);
    let ids: Vec<String> = storage.list().await.unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, ["new", "mid", "old"]);
}

#[tokio::test]
async fn load_missing_is_not_found() {
    let storage = MemoryStorage::new();
    let err = storage.load("nope").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(ref id) if id == "nope"));
    assert_eq!(err.error_code(), "E_DOCUMENT_NOT_FOUND");
}

#[tokio::test]
async fn delete_removes() {
    let storage = MemoryStorage::with_documents([doc("a", "2024-01-01T00:00:00Z")]);
    storage.delete("a").await.unwrap();
    assert!(storage.list().await.unwrap().is_empty());
    storage.delete("a").await.unwrap();
}

#[test]
fn document_wire_format_uses_markdown() {
    let json = serde_json::json!({
        "id": "n1",
        "title": "T",
        "markdown": "# hi",
        "tags": ["x"],
        "updatedAt": "2024-01-01T00:00:00Z"
    });
    let doc: Document = serde_json::from_value(json).unwrap();
    assert_eq!(doc.text, "# hi");
    assert_eq!(doc.updated_at, "2024-01-01T00:00:00Z");

    let back = serde_json::to_value(&doc).unwrap();
    assert_eq!(back["markdown"], "# hi");
    assert!(back.get("text").is_none());
}

#[test]
fn save_request_omits_missing_id() {
    let req = SaveRequest { id: None, title: "T".into(), text: "m".into(), tags: vec![] };
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("id").is_none());
    assert_eq!(json["markdown"], "m");
}

#[test]
fn backend_errors_keep_retryable_flag() {
    let err = StorageError::from(ApiError::Status { status: 503, message: "busy".into() });
    assert!(err.retryable());
    assert_eq!(err.error_code(), "E_API_STATUS");
    let err = StorageError::from(ApiError::Status { status: 400, message: "bad".into() });
    assert!(!err.retryable());
}

#[test]
fn error_message_prefers_error_field() {
    assert_eq!(crate::services::api::error_message(r#"{"error":"Missing note id"}"#), "Missing note id");
    assert_eq!(crate::services::api::error_message(" plain "), "plain");
}

#[test]
fn document_paths_escape_reserved_characters() {
    use crate::services::api::path_of;
    assert_eq!(path_of(&["load", "a/b?c#d"]), "/load/a%2Fb%3Fc%23d");
    assert_eq!(path_of(&["delete", "note 1"]), "/delete/note%201");
    assert_eq!(path_of(&["list"]), "/list");
}

#[test]
fn rfc3339_timestamp_shape() {
    let stamp = now_rfc3339();
    assert!(stamp.contains('T'));
    assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
}
