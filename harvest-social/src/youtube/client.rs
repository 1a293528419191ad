//! YouTube Data API v3 wrapper authenticated with an API key.
//!
//! The key travels as the `key` query parameter and is redacted from logs by
//! the HTTP layer. Quota exhaustion surfaces as a 403 `Api` error.
use crate::remote;
use crate::youtube::types::{CommentThreadListResponse, SearchListResponse};
use harvest_common::{HarvestError, Result};
use harvest_config::{HttpSettings, YoutubeConfig};
use harvest_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;
use std::time::Duration;

pub struct YoutubeApi {
    http: HttpClient,
    key: String,
}

impl YoutubeApi {
    pub fn new(cfg: &YoutubeConfig, http: &HttpSettings) -> Result<Self> {
        let client = HttpClient::new(&cfg.api_url)
            .map_err(|e| HarvestError::Config(format!("youtube client: {e}")))?
            .with_timeout(Duration::from_secs(http.timeout_secs))
            .with_retries(http.retries);
        Ok(Self {
            http: client,
            key: cfg.api_key.clone(),
        })
    }

    fn opts<'a>(&'a self, query: Vec<(&'a str, Cow<'a, str>)>) -> RequestOpts<'a> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(&self.key),
            }),
            query: Some(query),
            ..Default::default()
        }
    }

    /// One page of video search results.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<SearchListResponse> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("part", "id,snippet".into()),
            ("q", query.into()),
            ("type", "video".into()),
            ("maxResults", max_results.to_string().into()),
        ];
        if let Some(tok) = page_token {
            params.push(("pageToken", tok.into()));
        }
        self.http
            .get_json("search", self.opts(params))
            .await
            .map_err(remote)
    }

    /// One page of top-level comment threads for a video.
    pub async fn comment_threads(
        &self,
        video_id: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("part", "snippet".into()),
            ("videoId", video_id.into()),
            ("maxResults", max_results.to_string().into()),
            ("textFormat", "plainText".into()),
        ];
        if let Some(tok) = page_token {
            params.push(("pageToken", tok.into()));
        }
        self.http
            .get_json("commentThreads", self.opts(params))
            .await
            .map_err(remote)
    }
}
