//! Bounded pagination, comment expansion, and CSV output shared by every
//! collector pipeline.
//!
//! - `paging`: [`PagedEndpoint`] + [`BoundedCursor`], a restartable lazy walk
//!   over token-paginated listings
//! - `expand`: [`CommentSource`] + [`expand`], per-parent fetches under a
//!   [`FailurePolicy`]
//! - `sink`: [`RowSchema`] layouts, numbering, atomic CSV writes
//! - `run`: [`run_pipeline`] ties the stages together
pub mod expand;
pub mod paging;
pub mod run;
pub mod sink;

pub use expand::{CommentSource, ExpandOptions, Expansion, expand};
pub use harvest_common::FailurePolicy;
pub use paging::{BoundedCursor, Page, PageToken, PagedEndpoint};
pub use run::{RunOptions, RunReport, run_pipeline};
pub use sink::{DiscussionSchema, NameCount, RowSchema, VideoSchema};
