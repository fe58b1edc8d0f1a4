//! filejobs-core
//!
//! Background job processing for the files API: thumbnail generation and
//! welcome mail.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job, payloads, records, outcome）
//! - **ports**: 外部サービスの抽象化（JobStore, RecordLookup, ThumbnailGenerator, Notifier, Storage）
//! - **queue**: JobStore の in-memory / Redis 実装と retry policy
//! - **impls**: ports の具象実装（画像処理、ローカル FS、ログ通知、レコード参照）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry）
//! - **executors**: ThumbnailExecutor, WelcomeExecutor
//! - **app**: AppBuilder と worker loop

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod executors;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod typed;

pub use app::{App, AppBuilder, WorkerGroup};
pub use config::WorkerConfig;
pub use error::{JobError, StoreError};
