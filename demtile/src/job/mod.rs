//! Per-tile solver jobs.
//!
//! - [`JobSpecBuilder`] turns a [`Tile`](crate::grid::Tile) plus pass-through
//!   solver options into a [`JobSpec`] with fully materialized arguments.
//! - [`reconcile`] intersects tile bounds with a user crop window.
//! - [`JobResult`] is what one solver run leaves behind in its log.

mod builder;
mod crop;
mod record;

pub use builder::{JobSpec, JobSpecBuilder};
pub use crop::{parse_crop_window, reconcile};
pub use record::{read_logged_status, JobResult, LoggedStatus};

use thiserror::Error;

/// Errors raised while building jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("invalid crop window '{0}': expected four integers x0 y0 x1 y1")]
    InvalidCropWindow(String),
}
