//! Realtime collaborator: remote change notifications.
//!
//! The push transport itself lives outside this crate. Whatever drives it
//! holds a [`RealtimeSender`] and forwards events; the store drains the
//! receiver with `FlowStore::handle_realtime`.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default capacity of the event channel.
pub const REALTIME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RealtimeEvent {
    Connected,
    Disconnected,
    /// Also accepted under the backend's `noteUpdated` / `noteId` names.
    #[serde(rename_all = "camelCase", alias = "noteUpdated")]
    DocumentChanged {
        #[serde(alias = "noteId")]
        document_id: String,
    },
}

pub type RealtimeSender = mpsc::Sender<RealtimeEvent>;
pub type RealtimeReceiver = mpsc::Receiver<RealtimeEvent>;

#[must_use]
pub fn channel() -> (RealtimeSender, RealtimeReceiver) {
    mpsc::channel(REALTIME_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_changed_wire_format() {
        let event: RealtimeEvent =
            serde_json::from_value(serde_json::json!({ "type": "documentChanged", "documentId": "n1" })).unwrap();
        assert_eq!(event, RealtimeEvent::DocumentChanged { document_id: "n1".into() });
    }

    #[test]
    fn note_updated_alias_is_accepted() {
        let event: RealtimeEvent =
            serde_json::from_value(serde_json::json!({ "type": "noteUpdated", "noteId": "n1" })).unwrap();
        assert_eq!(event, RealtimeEvent::DocumentChanged { document_id: "n1".into() });
        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["type"], "documentChanged");
        assert_eq!(out["documentId"], "n1");
    }

    #[tokio::test]
    async fn channel_delivers_in_order() {
        let (tx, mut rx) = channel();
        tx.send(RealtimeEvent::Connected).await.unwrap();
        tx.send(RealtimeEvent::DocumentChanged { document_id: "a".into() })
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(RealtimeEvent::Connected));
        assert!(matches!(rx.recv().await, Some(RealtimeEvent::DocumentChanged { .. })));
    }
}
