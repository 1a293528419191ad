//! Per-parent comment expansion.
//!
//! Every parent produced by the query stage is handed to a [`CommentSource`].
//! What happens when one parent's fetch fails is decided by [`FailurePolicy`]:
//! `Skip` logs the parent and carries on with an empty comment set, `Abort`
//! ends the run with the error.
use async_trait::async_trait;
use futures::StreamExt;
use harvest_common::{Comment, FailurePolicy, ParentItem, Result};

/// Fetches the full, concrete comment list of one parent.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments_for(&self, parent: &ParentItem) -> Result<Vec<Comment>>;
}

#[async_trait]
impl<'a, C: CommentSource + ?Sized> CommentSource for &'a C {
    async fn comments_for(&self, parent: &ParentItem) -> Result<Vec<Comment>> {
        (**self).comments_for(parent).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    pub policy: FailurePolicy,
    /// Parents fetched at once. `1` is strictly sequential.
    pub concurrency: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Skip,
            concurrency: 1,
        }
    }
}

/// One parent together with its resolved comments.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub parent: ParentItem,
    pub comments: Vec<Comment>,
    /// Error message when the parent was skipped under [`FailurePolicy::Skip`].
    pub skipped: Option<String>,
}

/// Expand every parent, returning results in parent-arrival order.
///
/// With `concurrency > 1` fetches overlap, but results are still yielded in
/// the order the parents were given. Only remote failures (transport or
/// decode) are eligible for skipping; anything else aborts regardless of
/// policy.
pub async fn expand<C>(
    source: &C,
    parents: Vec<ParentItem>,
    opts: ExpandOptions,
) -> Result<Vec<Expansion>>
where
    C: CommentSource + ?Sized,
{
    let total = parents.len();
    let fetches = futures::stream::iter(parents.into_iter().enumerate())
        .map(|(idx, parent)| async move {
            tracing::info!(
                parent_id = %parent.id,
                title = parent.title.as_deref().unwrap_or("-"),
                position = idx + 1,
                total,
                "expand.parent.start"
            );
            let result = source.comments_for(&parent).await;
            (parent, result)
        })
        .buffered(opts.concurrency.max(1));
    let mut fetches = std::pin::pin!(fetches);

    let mut out = Vec::with_capacity(total);
    while let Some((parent, result)) = fetches.next().await {
        match result {
            Ok(comments) => {
                tracing::info!(
                    parent_id = %parent.id,
                    comments = comments.len(),
                    "expand.parent.done"
                );
                out.push(Expansion {
                    parent,
                    comments,
                    skipped: None,
                });
            }
            Err(err) if opts.policy == FailurePolicy::Skip && err.is_remote() => {
                tracing::warn!(
                    parent_id = %parent.id,
                    error = %err,
                    "expand.parent.skipped"
                );
                out.push(Expansion {
                    parent,
                    comments: Vec::new(),
                    skipped: Some(err.to_string()),
                });
            }
            Err(err) => {
                tracing::error!(
                    parent_id = %parent.id,
                    error = %err,
                    "expand.parent.failed"
                );
                return Err(err);
            }
        }
    }
    Ok(out)
}
