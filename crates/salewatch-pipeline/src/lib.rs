//! Refresh cycle orchestration and the read boundary over the live dataset.
//!
//! [`DatasetSwap`] runs a full fetch → aggregate → persist → diff cycle into
//! a private working copy and publishes the result with a single reference
//! swap. [`ReadApi`] serves whatever is live, loading on demand when nothing
//! has been published yet.

pub mod dataset;
pub mod error;
pub mod read;
pub mod swap;

pub use dataset::{Dataset, DatasetSource};
pub use error::{PipelineError, ReadError};
pub use read::{ReadApi, SalesKind, SalesView};
pub use swap::{DatasetSwap, RefreshOutcome, RefreshPhase};
