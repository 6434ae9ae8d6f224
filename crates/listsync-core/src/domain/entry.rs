//! Pending write entries: local mutations waiting for remote persistence.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::EntryId;

/// What the local mutation did to the target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl WriteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One durable record awaiting remote persistence.
///
/// Entries are immutable: there are no setters, and the orchestrator only ever
/// keeps or drops them as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWriteEntry {
    id: EntryId,
    timestamp: DateTime<Utc>,
    action: WriteAction,
    entity_type: String,
    entity_id: String,
    actor: String,
    channel: String,
    #[serde(default)]
    after: serde_json::Value,
}

impl PendingWriteEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntryId,
        timestamp: DateTime<Utc>,
        action: WriteAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
        channel: impl Into<String>,
        after: serde_json::Value,
    ) -> Self {
        Self {
            id,
            timestamp,
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            channel: channel.into(),
            after,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn action(&self) -> WriteAction {
        self.action
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn after(&self) -> &serde_json::Value {
        &self.after
    }

    /// Column values of the remote audit item this entry becomes.
    ///
    /// `EntryId` is the remote uniqueness key: re-sending an entry that already
    /// landed is rejected with 409, which the batch decoder reads as a duplicate.
    pub fn to_list_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "Title": format!("{}:{}:{}", self.action, self.entity_type, self.entity_id),
            "EntryId": self.id.as_ulid().to_string(),
            "Timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "Action": self.action.as_str(),
            "EntityType": self.entity_type,
            "EntityId": self.entity_id,
            "Actor": self.actor,
            "Channel": self.channel,
            "AfterJson": self.after.to_string(),
        })
    }
}
