//! Executors: one per queue, payload in, side effects + Outcome out.
//!
//! Every precondition is checked with an early return. A failed check ends
//! the execution immediately with `Failure(reason)`; nothing after it runs.

pub mod thumbnail;
pub mod welcome;

#[cfg(test)]
pub(crate) mod testing;

pub use self::thumbnail::{THUMBNAIL_WIDTHS, ThumbnailExecutor, thumbnail_path};
pub use self::welcome::{WELCOME_SUBJECT, WelcomeExecutor, welcome_envelope};
