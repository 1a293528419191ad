//! Platform clients and pipeline adapters for Reddit and YouTube.
//!
//! Each platform module has the same layout: `client` wraps the HTTP API,
//! `types` mirrors the wire JSON, `extract` maps wire records into
//! [`harvest_common::ParentItem`] / [`harvest_common::Comment`], and `source`
//! plugs the client into `harvest-pipeline` as a search endpoint plus a
//! comment source.
use harvest_common::HarvestError;
use harvest_http::HttpError;

pub mod reddit;
pub mod youtube;

/// Fold an HTTP failure into the shared error type.
///
/// Undecodable payloads stay distinguishable from transport failures so the
/// logs say which one happened; both count as remote failures.
pub(crate) fn remote(err: HttpError) -> HarvestError {
    match err {
        HttpError::Decode(..) => HarvestError::Decode(err.to_string()),
        other => HarvestError::Transport(other.to_string()),
    }
}
