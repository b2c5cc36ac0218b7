//! Conversation and history-row identifiers.

use crate::string_id::define_string_id;

define_string_id! {
    /// Identifier of a conversation (the parent of every history row).
    pub struct ConversationId("conversation id");
}

define_string_id! {
    /// Identifier of a single `conversation_state_history` row.
    ///
    /// Generated values are ULIDs, so lexicographic order follows creation
    /// order. Caller-supplied values are stored unchanged.
    pub struct HistoryId("history id");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_parse_reports_kind_and_reason() {
        let err = ConversationId::parse(" c1").unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidId { kind: "conversation id", .. }
        ));
        assert_eq!(
            err.to_string(),
            "[C009] Invalid conversation id ' c1': must not start or end with whitespace"
        );
        assert!(HistoryId::parse(String::new()).is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid conversation id '': must not be empty")]
    fn test_new_panics_on_invalid() {
        let _ = ConversationId::new("");
    }

    #[test]
    fn test_display_and_deref() {
        let id = ConversationId::new("conv-1");
        assert_eq!(format!("{}", id), "conv-1");
        assert!(id.starts_with("conv-"));
        assert_eq!(id, "conv-1");
    }

    #[test]
    fn test_deserialize_validates() {
        let err = serde_json::from_str::<HistoryId>(r#""""#).unwrap_err();
        assert!(err.to_string().contains("Invalid history id"));

        let err = serde_json::from_str::<HistoryId>(r#""h1\t""#).unwrap_err();
        assert!(err.to_string().contains("whitespace"));

        let ok: HistoryId = serde_json::from_str(r#""01HZX""#).unwrap();
        assert_eq!(ok.as_str(), "01HZX");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ConversationId::new("conv-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""conv-9""#);
        assert_eq!(String::from(id), "conv-9");
    }

    #[test]
    fn test_lookup_by_str() {
        use std::collections::HashMap;
        let mut map: HashMap<ConversationId, usize> = HashMap::new();
        map.insert(ConversationId::new("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
    }
}
