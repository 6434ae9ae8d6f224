//! Domain model (ids, pending entries, tokens, outcomes, batch results, errors).

pub mod batch;
pub mod entry;
pub mod errors;
pub mod etag;
pub mod ids;
pub mod operation;
pub mod outcome;
pub mod status;

pub use self::batch::{BatchItemResult, BatchResult, ItemDisposition, ItemError};
pub use self::entry::{PendingWriteEntry, WriteAction};
pub use self::errors::{ListStoreError, StoreError, TransportError};
pub use self::etag::ETag;
pub use self::ids::{BatchId, EntryId};
pub use self::operation::{OperationKind, WriteOp};
pub use self::outcome::{WriteOutcome, WriteSuccess};
pub use self::status::{ErrorCategory, StatusClass};
