//! YouTube Data API v3: video search and top-level comment threads.
pub mod client;
pub mod extract;
pub mod source;
pub mod types;

pub use client::YoutubeApi;
pub use source::{VideoComments, YoutubeComments, YoutubeSearch};
