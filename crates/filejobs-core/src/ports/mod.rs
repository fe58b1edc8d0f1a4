//! Ports - 外部サービスへのインターフェース
//!
//! 各 trait はジョブ実行が依存する外部システム（キュー、DB、画像処理、メール）
//! を抽象化する。起動時に具象実装を一度だけ生成し、`Arc<dyn ...>` で
//! executor と runtime に明示的に渡す（グローバル状態は持たない）。

pub mod job_store;
pub mod notifier;
pub mod record_lookup;
pub mod storage;
pub mod thumbnail;

pub use self::job_store::{JobLease, JobStore};
pub use self::notifier::{MailEnvelope, Notifier};
pub use self::record_lookup::RecordLookup;
pub use self::storage::Storage;
pub use self::thumbnail::ThumbnailGenerator;
