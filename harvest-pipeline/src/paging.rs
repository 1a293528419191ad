//! Bounded, token-driven pagination.
//!
//! A [`PagedEndpoint`] serves one page per call together with an opaque
//! continuation token. [`BoundedCursor`] walks those pages lazily until the
//! caller's budget is spent or the endpoint stops handing out tokens. Each call
//! asks for `min(page_size_cap, remaining_budget)` items, so a budget that the
//! first page satisfies never triggers a second request.
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use harvest_common::Result;
use std::fmt;

/// Opaque cursor returned by a paged API; absence means exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an optional wire token, treating empty strings as "no more pages".
    pub fn from_wire(raw: Option<String>) -> Option<Self> {
        raw.filter(|s| !s.is_empty()).map(Self)
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One batch of items plus the token for the batch after it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// A listing endpoint that serves results one page at a time.
#[async_trait]
pub trait PagedEndpoint: Send + Sync {
    type Item: Send;

    /// Largest `limit` the endpoint accepts in one call.
    fn page_size_cap(&self) -> usize;

    /// Fetch up to `limit` items starting at `token` (or the beginning).
    async fn fetch_page(
        &self,
        limit: usize,
        token: Option<&PageToken>,
    ) -> Result<Page<Self::Item>>;
}

#[async_trait]
impl<'a, E: PagedEndpoint + ?Sized> PagedEndpoint for &'a E {
    type Item = E::Item;

    fn page_size_cap(&self) -> usize {
        (**self).page_size_cap()
    }

    async fn fetch_page(
        &self,
        limit: usize,
        token: Option<&PageToken>,
    ) -> Result<Page<Self::Item>> {
        (**self).fetch_page(limit, token).await
    }
}

/// Restartable walk over a [`PagedEndpoint`] bounded by an item budget.
pub struct BoundedCursor<E> {
    endpoint: E,
    budget: usize,
    start: Option<PageToken>,
}

impl<E: PagedEndpoint> BoundedCursor<E> {
    pub fn new(endpoint: E, budget: usize) -> Self {
        Self {
            endpoint,
            budget,
            start: None,
        }
    }

    /// Begin from a previously returned continuation token instead of page one.
    pub fn resume_from(mut self, token: PageToken) -> Self {
        self.start = Some(token);
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Lazily fetch pages. Every call starts a fresh walk from the cursor's
    /// starting point; nothing is fetched until the stream is polled.
    ///
    /// The last page is truncated to the remaining budget. A page that hands
    /// back the token it was requested with ends the walk.
    pub fn pages(&self) -> impl Stream<Item = Result<Page<E::Item>>> + Send + '_ {
        async_stream::try_stream! {
            let cap = self.endpoint.page_size_cap().max(1);
            let mut remaining = self.budget;
            let mut token = self.start.clone();
            let mut calls = 0usize;

            while remaining > 0 {
                let limit = remaining.min(cap);
                calls += 1;
                let mut page = self.endpoint.fetch_page(limit, token.as_ref()).await?;
                page.items.truncate(remaining);
                remaining -= page.items.len();

                let next = page.next.clone();
                let stalled = next.is_some() && next == token;
                tracing::debug!(
                    call = calls,
                    limit,
                    received = page.items.len(),
                    remaining,
                    has_next = next.is_some(),
                    stalled,
                    "paging.page"
                );

                yield page;

                match next {
                    Some(next) if !stalled => token = Some(next),
                    _ => break,
                }
            }
        }
    }

    /// Drain [`BoundedCursor::pages`] into a flat item list.
    pub async fn collect(&self) -> Result<Vec<E::Item>> {
        let mut pages = std::pin::pin!(self.pages());
        let mut items = Vec::new();
        while let Some(page) = pages.try_next().await? {
            items.extend(page.items);
        }
        Ok(items)
    }
}
