//! Transaction submission and composer session.
//!
//! - [`SubmissionEngine`]: sends a signed envelope and drives the bounded
//!   confirmation wait, with retry / wait-longer remediation.
//! - [`Composer`]: the draft being edited, revalidated on every change.
//! - [`StateStore`]: persisted draft and signed-envelope slots.
//! - [`LatestOnly`]: debounced lookups where only the newest result counts.

pub mod broadcast;
pub mod composer;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod settings;
pub mod store;

pub use broadcast::Broadcaster;
pub use composer::Composer;
pub use engine::{EngineConfig, SubmissionEngine, SubmissionEvent, SubmissionState};
pub use error::{
    ComposeError, EngineError, ImportError, StoreError, SubmissionError, SubmissionErrorKind,
};
pub use lookup::{AssetLookup, LatestOnly};
pub use settings::Settings;
pub use store::{FileStore, MemoryStore, StateStore};
