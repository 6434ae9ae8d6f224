//! Operations against a named list.

use super::etag::ETag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    /// `X-HTTP-Method` override for update-style operations sent as POST.
    pub fn method_override(self) -> Option<&'static str> {
        match self {
            OperationKind::Update => Some("MERGE"),
            OperationKind::Delete => Some("DELETE"),
            OperationKind::Read | OperationKind::Create => None,
        }
    }

    pub fn is_write(self) -> bool {
        self != OperationKind::Read
    }
}

/// One create/read/update/delete against a list.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub kind: OperationKind,
    pub list: String,
    pub item_id: Option<u64>,
    pub payload: Option<serde_json::Value>,
    pub etag: Option<ETag>,
    /// `$select` fields for reads; empty means all fields.
    pub select: Vec<String>,
}

impl WriteOp {
    fn new(kind: OperationKind, list: impl Into<String>) -> Self {
        Self {
            kind,
            list: list.into(),
            item_id: None,
            payload: None,
            etag: None,
            select: Vec::new(),
        }
    }

    pub fn create(list: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(OperationKind::Create, list)
        }
    }

    pub fn read(list: impl Into<String>, item_id: u64) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::new(OperationKind::Read, list)
        }
    }

    pub fn update(
        list: impl Into<String>,
        item_id: u64,
        payload: serde_json::Value,
        etag: Option<ETag>,
    ) -> Self {
        Self {
            item_id: Some(item_id),
            payload: Some(payload),
            etag,
            ..Self::new(OperationKind::Update, list)
        }
    }

    pub fn delete(list: impl Into<String>, item_id: u64, etag: Option<ETag>) -> Self {
        Self {
            item_id: Some(item_id),
            etag,
            ..Self::new(OperationKind::Delete, list)
        }
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_etag(mut self, etag: ETag) -> Self {
        self.etag = Some(etag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_for_update_and_delete() {
        assert_eq!(OperationKind::Update.method_override(), Some("MERGE"));
        assert_eq!(OperationKind::Delete.method_override(), Some("DELETE"));
        assert_eq!(OperationKind::Create.method_override(), None);
        assert!(!OperationKind::Read.is_write());
    }

    #[test]
    fn with_etag_replaces_token() {
        let op = WriteOp::update("Daily", 3, serde_json::json!({}), ETag::parse("\"1\""));
        let op = op.with_etag(ETag::parse("\"2\"").unwrap());
        assert_eq!(op.etag.unwrap().opaque(), "2");
    }
}
