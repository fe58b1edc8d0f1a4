//! Task trait - payload 型と queue 名の対応付け

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Binds a payload type to the queue that carries it.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct ResizeAvatar { user_id: String }
///
/// impl Task for ResizeAvatar {
///     const QUEUE: &'static str = "avatar-queue";
/// }
/// ```
///
/// - `Serialize`: producers enqueue it as JSON
/// - `DeserializeOwned`: workers decode it from the stored payload
/// - `Send + Sync + 'static`: handlers live behind `Arc`
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const QUEUE: &'static str;
}
