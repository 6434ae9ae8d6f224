//! Strongly-typed identifiers.
//!
//! `Id<T>` は ULID を包むジェネリック ID 型です。`T` は PhantomData のマーカーで、
//! EntryId と BatchId を型レベルで区別します（実行時コストはゼロ）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"entry-", "batch_"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// Serialize 時は ULID 文字列のみ（プレフィックスなし）になります。
/// ローカルキューの JSON に保存されるため、形式を変えないこと。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ulid::DecodeError;

    /// Accepts both the bare ULID and the prefixed display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw).map(Self::from_ulid)
    }
}

/// Pending entry のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entry {}

impl IdMarker for Entry {
    fn prefix() -> &'static str {
        "entry-"
    }
}

/// Batch (multipart boundary) のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Batch {}

impl IdMarker for Batch {
    fn prefix() -> &'static str {
        "batch_"
    }
}

/// Identifier of one pending write (also the remote uniqueness key).
pub type EntryId = Id<Entry>;

/// Identifier of one batch submission; its display form is the multipart boundary.
pub type BatchId = Id<Batch>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_type_prefix() {
        let ulid = Ulid::new();
        let entry = EntryId::from_ulid(ulid);
        let batch = BatchId::from_ulid(ulid);

        assert_eq!(entry.to_string(), format!("entry-{ulid}"));
        assert_eq!(batch.to_string(), format!("batch_{ulid}"));
        // let _: EntryId = batch; // <- does not compile
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let ulid = Ulid::new();
        let entry = EntryId::from_ulid(ulid);

        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));

        let back: EntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn parses_prefixed_and_bare_forms() {
        let ulid = Ulid::new();
        let a: EntryId = format!("entry-{ulid}").parse().unwrap();
        let b: EntryId = ulid.to_string().parse().unwrap();
        assert_eq!(a, b);
        assert!("entry-nope".parse::<EntryId>().is_err());
    }
}
