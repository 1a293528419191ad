use crate::reddit::client::RedditApi;
use crate::reddit::extract::post_to_parent;
use crate::reddit::tree::{CommentForest, MoreLimits};
use async_trait::async_trait;
use harvest_common::{Comment, ParentItem, Result};
use harvest_pipeline::{CommentSource, Page, PageToken, PagedEndpoint};

/// Reddit caps `limit` on search listings at 100.
pub const SEARCH_PAGE_CAP: usize = 100;

/// Keyword search over posts, paged by the `after` fullname.
pub struct RedditSearch<'a> {
    api: &'a RedditApi,
    query: String,
}

impl<'a> RedditSearch<'a> {
    pub fn new(api: &'a RedditApi, query: impl Into<String>) -> Self {
        Self {
            api,
            query: query.into(),
        }
    }
}

#[async_trait]
impl<'a> PagedEndpoint for RedditSearch<'a> {
    type Item = ParentItem;

    fn page_size_cap(&self) -> usize {
        SEARCH_PAGE_CAP
    }

    async fn fetch_page(
        &self,
        limit: usize,
        token: Option<&PageToken>,
    ) -> Result<Page<ParentItem>> {
        let listing = self
            .api
            .search(&self.query, limit, token.map(PageToken::as_str))
            .await?;
        let items = listing
            .data
            .children
            .into_iter()
            .map(|thing| post_to_parent(thing.data))
            .collect();
        Ok(Page {
            items,
            next: PageToken::from_wire(listing.data.after),
        })
    }
}

/// Every comment of a post, with all placeholders resolved within `limits`.
pub struct RedditComments<'a> {
    api: &'a RedditApi,
    limits: MoreLimits,
}

impl<'a> RedditComments<'a> {
    pub fn new(api: &'a RedditApi, limits: MoreLimits) -> Self {
        Self { api, limits }
    }
}

#[async_trait]
impl<'a> CommentSource for RedditComments<'a> {
    async fn comments_for(&self, parent: &ParentItem) -> Result<Vec<Comment>> {
        let listing = self.api.comment_tree(&parent.id).await?;
        let mut forest = CommentForest::from_listing(&parent.id, listing);
        let initial = forest.len();
        let stats = forest.resolve(self.api, self.limits).await?;
        tracing::debug!(
            post_id = %parent.id,
            initial,
            resolved = forest.len(),
            placeholders_fetched = stats.fetched,
            placeholders_unresolved = stats.unresolved,
            "reddit.comments.resolved"
        );
        Ok(forest.into_comments())
    }
}
