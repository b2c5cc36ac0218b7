//! Conversation state history record types.
//!
//! A history row records one status transition of a conversation. Rows are
//! written once and never updated; they disappear only when the owning
//! conversation is deleted.

use crate::error::{CoreError, CoreResult};
use crate::ids::{ConversationId, HistoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Category of the party that caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// End user of the conversation
    User,
    /// AI agent
    Agent,
    /// The platform itself (default)
    #[default]
    System,
    /// Human supervisor
    Supervisor,
    /// Tool invocation
    Tool,
    /// Support staff
    Support,
}

impl ActorType {
    /// Every allowed actor type, in declaration order
    pub const ALL: [ActorType; 6] = [
        ActorType::User,
        ActorType::Agent,
        ActorType::System,
        ActorType::Supervisor,
        ActorType::Tool,
        ActorType::Support,
    ];

    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Agent => "agent",
            ActorType::System => "system",
            ActorType::Supervisor => "supervisor",
            ActorType::Tool => "tool",
            ActorType::Support => "support",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        ActorType::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::InvalidActorType {
                value: s.to_string(),
                expected: ActorType::ALL
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// A transition to be appended to the history log.
///
/// `to_status` is optional here only so a missing value can be rejected by
/// the store with a not-null error; [`NewTransition::new`] always sets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransition {
    /// Explicit identifier; generated on insert when `None`
    #[serde(default)]
    pub history_id: Option<HistoryId>,

    /// Owning conversation
    pub conv_id: ConversationId,

    /// Prior status, absent for the initial transition
    #[serde(default)]
    pub from_status: Option<String>,

    /// New status
    #[serde(default)]
    pub to_status: Option<String>,

    /// Who caused the transition
    #[serde(default)]
    pub actor_type: ActorType,

    /// Free-text actor identifier
    #[serde(default)]
    pub actor_id: Option<String>,

    /// Free-text reason
    #[serde(default)]
    pub reason: Option<String>,

    /// Arbitrary structured metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Creation time; the insert time when `None`
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTransition {
    /// Transition of `conv_id` into `to_status`, with every optional field
    /// left at its default.
    pub fn new(conv_id: ConversationId, to_status: impl Into<String>) -> Self {
        Self {
            history_id: None,
            conv_id,
            from_status: None,
            to_status: Some(to_status.into()),
            actor_type: ActorType::default(),
            actor_id: None,
            reason: None,
            metadata: Map::new(),
            created_at: None,
        }
    }

    /// Set the prior status
    pub fn from_status(mut self, status: impl Into<String>) -> Self {
        self.from_status = Some(status.into());
        self
    }

    /// Set the actor category and optional identifier
    pub fn actor(mut self, actor_type: ActorType, actor_id: Option<String>) -> Self {
        self.actor_type = actor_type;
        self.actor_id = actor_id;
        self
    }

    /// Set the reason
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Use an explicit identifier instead of a generated one
    pub fn with_id(mut self, id: HistoryId) -> Self {
        self.history_id = Some(id);
        self
    }

    /// Add one metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Pin the creation time
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A stored history row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row identifier
    pub history_id: HistoryId,

    /// Owning conversation
    pub conv_id: ConversationId,

    /// Prior status
    pub from_status: Option<String>,

    /// New status
    pub to_status: String,

    /// Who caused the transition
    pub actor_type: ActorType,

    /// Free-text actor identifier
    pub actor_id: Option<String>,

    /// Free-text reason
    pub reason: Option<String>,

    /// Structured metadata
    pub metadata: Map<String, Value>,

    /// When the row was written
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Returns `true` for the first transition of a conversation
    pub fn is_initial(&self) -> bool {
        self.from_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_type_default_is_system() {
        assert_eq!(ActorType::default(), ActorType::System);
    }

    #[test]
    fn test_actor_type_parse_roundtrip() {
        for actor in ActorType::ALL {
            assert_eq!(actor.as_str().parse::<ActorType>().unwrap(), actor);
        }
    }

    #[test]
    fn test_actor_type_parse_rejects_unknown() {
        let err = "robot".parse::<ActorType>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("robot"));
        assert!(msg.contains("user, agent, system, supervisor, tool, support"));
    }

    #[test]
    fn test_actor_type_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ActorType::Supervisor).unwrap(),
            r#""supervisor""#
        );
    }

    #[test]
    fn test_new_transition_defaults() {
        let t = NewTransition::new(ConversationId::new("c1"), "active");
        assert_eq!(t.to_status.as_deref(), Some("active"));
        assert!(t.history_id.is_none());
        assert!(t.from_status.is_none());
        assert_eq!(t.actor_type, ActorType::System);
        assert!(t.metadata.is_empty());
        assert!(t.created_at.is_none());
    }

    #[test]
    fn test_new_transition_builder() {
        let t = NewTransition::new(ConversationId::new("c1"), "escalated")
            .from_status("active")
            .actor(ActorType::Agent, Some("triage-bot".to_string()))
            .reason("customer asked for a human")
            .meta("priority", Value::from(2))
            .with_id(HistoryId::new("custom-id"));

        assert_eq!(t.from_status.as_deref(), Some("active"));
        assert_eq!(t.actor_type, ActorType::Agent);
        assert_eq!(t.actor_id.as_deref(), Some("triage-bot"));
        assert_eq!(t.metadata.get("priority"), Some(&Value::from(2)));
        assert_eq!(t.history_id.as_ref().map(|h| h.as_str()), Some("custom-id"));
    }

    #[test]
    fn test_new_transition_deserializes_with_defaults() {
        let t: NewTransition =
            serde_json::from_str(r#"{"conv_id": "c1", "to_status": "closed"}"#).unwrap();
        assert_eq!(t.actor_type, ActorType::System);
        assert!(t.metadata.is_empty());
    }
}
