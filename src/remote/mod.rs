//! Remote tracking subsystem: turns raw button edges into gestures
//!
//! Components, leaves first:
//!
//! 1. [`gesture`] - Press/release state chain of one gesture
//! 2. [`history`] - Locked gesture state of one in-flight tracking session
//! 3. [`watcher`] - Checkpoint loop classifying one history
//! 4. [`tracker`] - At most one live watcher per button
//! 5. [`topology`] - Catalog of remotes and the handler table built from it
//! 6. [`dispatcher`] - Resolves raw edges against the current handler table
//!
//! # Architecture
//!
//! ```text
//! Gateway ──► EdgeDispatcher ──► ButtonTracker ──► ButtonHistory
//!                  ▲                   │                ▲
//!             HandlerTable          spawns              │ checkpoints
//!                  │                   ▼                │
//!           RemoteTopology       ButtonWatcher ─────────┘──► EventSink
//! ```
//!
//! Everything runs as tasks on one tokio runtime. The tracker's watcher map
//! and each history's state sit behind their own mutex; neither is held
//! across I/O.

pub mod dispatcher;
pub mod error;
pub mod gesture;
pub mod history;
pub mod model;
pub mod topology;
pub mod tracker;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::EdgeDispatcher;
pub use error::{TopologyError, TrackingError};
pub use topology::{RemoteTopology, TopologySnapshot};
pub use tracker::ButtonTracker;
