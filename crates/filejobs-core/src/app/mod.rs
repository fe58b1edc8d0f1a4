//! App - ワーカーランタイム
//!
//! # 主要コンポーネント
//! - **AppBuilder**: executor の登録と起動時検証（Fail-fast）
//! - **worker_loop**: lease → decode → execute → ack / fail
//! - **WorkerGroup**: キューごとに 1 タスクを起動し、shutdown を配る

pub mod builder;
pub mod worker_group;
pub mod worker_loop;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::worker_group::WorkerGroup;
pub use self::worker_loop::process_one;
