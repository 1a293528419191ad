//! Reddit: OAuth app-only search plus full comment-tree resolution.
//!
//! A post's first comment fetch returns a partial tree. The rest hides behind
//! `more` stubs, which [`tree::CommentForest::resolve`] replaces with real
//! comments before the tree is flattened breadth-first.
pub mod client;
pub mod extract;
pub mod source;
pub mod tree;
pub mod types;

pub use client::RedditApi;
pub use source::{RedditComments, RedditSearch};
pub use tree::{CommentForest, MoreFetcher, MoreLimits};
