use serde::Deserialize;

use crate::data::Action;

/// Inbound action document sent by clients over the websocket.
///
/// `senderId` is advisory only: the connection a document arrives on is
/// the authoritative identity, and a mismatch is logged and ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "actionType")]
pub enum ClientAction {
    #[serde(rename = "START")]
    Start {
        #[serde(rename = "senderId", default)]
        sender_id: Option<String>,
    },
    #[serde(rename = "OPEN")]
    Open {
        #[serde(rename = "senderId", default)]
        sender_id: Option<String>,
        row: usize,
        col: usize,
    },
    #[serde(rename = "FLAG")]
    Flag {
        #[serde(rename = "senderId", default)]
        sender_id: Option<String>,
        row: usize,
        col: usize,
    },
    #[serde(rename = "CHAT")]
    Chat {
        #[serde(rename = "senderId", default)]
        sender_id: Option<String>,
        message: String,
    },
}

impl ClientAction {
    pub fn sender_id(&self) -> Option<&str> {
        match self {
            Self::Start { sender_id }
            | Self::Open { sender_id, .. }
            | Self::Flag { sender_id, .. }
            | Self::Chat { sender_id, .. } => sender_id.as_deref(),
        }
    }

    /// Board action carried by this document, if any. Chat documents
    /// are relayed without touching the room state.
    pub fn action(&self) -> Option<Action> {
        match *self {
            Self::Start { .. } => Some(Action::Start),
            Self::Open { row, col, .. } => Some(Action::Open { row, col }),
            Self::Flag { row, col, .. } => Some(Action::Flag { row, col }),
            Self::Chat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_document() {
        let doc = r#"{"actionType": "OPEN", "senderId": "abc", "row": 3, "col": 7}"#;
        let parsed: ClientAction = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed.sender_id(), Some("abc"));
        assert_eq!(parsed.action(), Some(Action::Open { row: 3, col: 7 }));
    }

    #[test]
    fn parses_start_without_sender() {
        let doc = r#"{"actionType": "START"}"#;
        let parsed: ClientAction = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed.sender_id(), None);
        assert_eq!(parsed.action(), Some(Action::Start));
    }

    #[test]
    fn chat_document_is_not_a_board_action() {
        let doc = r#"{"actionType": "CHAT", "senderId": "abc", "message": "good luck"}"#;
        let parsed: ClientAction = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed.action(), None);
        assert!(matches!(
            parsed,
            ClientAction::Chat { ref message, .. } if message == "good luck"
        ));
    }

    #[test]
    fn rejects_unknown_action_type() {
        let doc = r#"{"actionType": "NUKE", "row": 0, "col": 0}"#;
        assert!(serde_json::from_str::<ClientAction>(doc).is_err());
    }
}
