//! Codec - list store のワイヤ形式
//!
//! - **multipart**: `multipart/mixed` の読み取り
//! - **batch**: `$batch` リクエストのエンコードとレスポンスのデコード
//! - **odata**: OData JSON（エラーメッセージ、body 内の ETag）

pub mod batch;
pub mod multipart;
pub mod odata;

pub use self::batch::{
    BatchResponseBuilder, EncodedBatch, decode_batch_response, encode_batch, parse_batch_request,
};
