use crate::youtube::client::YoutubeApi;
use crate::youtube::extract::{search_result_to_parent, thread_to_comment};
use async_trait::async_trait;
use harvest_common::{Comment, ParentItem, Result};
use harvest_pipeline::{BoundedCursor, CommentSource, Page, PageToken, PagedEndpoint};

/// `maxResults` ceiling of `search.list`.
pub const SEARCH_PAGE_CAP: usize = 50;
/// `maxResults` ceiling of `commentThreads.list`.
pub const THREAD_PAGE_CAP: usize = 100;

pub struct YoutubeSearch<'a> {
    api: &'a YoutubeApi,
    query: String,
}

impl<'a> YoutubeSearch<'a> {
    pub fn new(api: &'a YoutubeApi, query: impl Into<String>) -> Self {
        Self {
            api,
            query: query.into(),
        }
    }
}

#[async_trait]
impl<'a> PagedEndpoint for YoutubeSearch<'a> {
    type Item = ParentItem;

    fn page_size_cap(&self) -> usize {
        SEARCH_PAGE_CAP
    }

    async fn fetch_page(
        &self,
        limit: usize,
        token: Option<&PageToken>,
    ) -> Result<Page<ParentItem>> {
        let resp = self
            .api
            .search(&self.query, limit, token.map(PageToken::as_str))
            .await?;
        let items = resp
            .items
            .into_iter()
            .filter_map(search_result_to_parent)
            .collect();
        Ok(Page {
            items,
            next: PageToken::from_wire(resp.next_page_token),
        })
    }
}

/// Comment threads of one video as a paged endpoint.
pub struct VideoComments<'a> {
    api: &'a YoutubeApi,
    video_id: String,
}

impl<'a> VideoComments<'a> {
    pub fn new(api: &'a YoutubeApi, video_id: impl Into<String>) -> Self {
        Self {
            api,
            video_id: video_id.into(),
        }
    }
}

#[async_trait]
impl<'a> PagedEndpoint for VideoComments<'a> {
    type Item = Comment;

    fn page_size_cap(&self) -> usize {
        THREAD_PAGE_CAP
    }

    async fn fetch_page(&self, limit: usize, token: Option<&PageToken>) -> Result<Page<Comment>> {
        let resp = self
            .api
            .comment_threads(&self.video_id, limit, token.map(PageToken::as_str))
            .await?;
        let items = resp
            .items
            .into_iter()
            .map(|thread| thread_to_comment(&self.video_id, thread))
            .collect();
        Ok(Page {
            items,
            next: PageToken::from_wire(resp.next_page_token),
        })
    }
}

/// Top-level comments of each video, at most `max_per_video` of them.
pub struct YoutubeComments<'a> {
    api: &'a YoutubeApi,
    max_per_video: usize,
}

impl<'a> YoutubeComments<'a> {
    pub fn new(api: &'a YoutubeApi, max_per_video: usize) -> Self {
        Self { api, max_per_video }
    }
}

#[async_trait]
impl<'a> CommentSource for YoutubeComments<'a> {
    async fn comments_for(&self, parent: &ParentItem) -> Result<Vec<Comment>> {
        BoundedCursor::new(VideoComments::new(self.api, &parent.id), self.max_per_video)
            .collect()
            .await
    }
}
