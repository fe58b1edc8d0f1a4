//! Impls - ports の具象実装
//!
//! - **ImageThumbnailer**: `image` クレートによるリサイズ
//! - **LocalStorage**: ローカル FS
//! - **InMemoryRecords**: JSON スナップショットから読むレコード参照
//! - **LogNotifier**: 送信内容をログに出すだけの通知
//!
//! JobStore の実装は `queue` モジュールにある。

pub mod image_thumbnailer;
pub mod inmem_records;
pub mod local_storage;
pub mod log_notifier;

pub use self::image_thumbnailer::ImageThumbnailer;
pub use self::inmem_records::{InMemoryRecords, RecordsSnapshot};
pub use self::local_storage::LocalStorage;
pub use self::log_notifier::LogNotifier;
