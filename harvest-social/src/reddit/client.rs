//! Reddit OAuth API wrapper with an app-only (client credentials) token.
//!
//! The token is fetched lazily and cached until shortly before it expires.
//! Every listing call asks for `raw_json=1` so bodies arrive unescaped.
use crate::reddit::tree::MoreFetcher;
use crate::reddit::types::{
    CommentThing, CommentTreeResponse, Listing, MoreChildrenResponse, PostThing, TokenResponse,
};
use crate::remote;
use async_trait::async_trait;
use harvest_common::{HarvestError, Result};
use harvest_config::{HttpSettings, RedditConfig};
use harvest_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Top-level comments requested with the first tree fetch.
const COMMENT_TREE_LIMIT: &str = "500";
/// Refresh this long before the server-side expiry.
const TOKEN_SLACK: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_TTL: u64 = 3600;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditApi {
    auth: HttpClient,
    api: HttpClient,
    client_id: String,
    client_secret: String,
    subreddit: String,
    sort: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditApi {
    pub fn new(cfg: &RedditConfig, http: &HttpSettings) -> Result<Self> {
        let timeout = Duration::from_secs(http.timeout_secs);
        let build = |base: &str| {
            HttpClient::new(base)
                .and_then(|c| c.with_user_agent(&cfg.user_agent))
                .map(|c| c.with_timeout(timeout).with_retries(http.retries))
                .map_err(|e| HarvestError::Config(format!("reddit client: {e}")))
        };
        Ok(Self {
            auth: build(&cfg.auth_url)?,
            api: build(&cfg.api_url)?,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            subreddit: cfg.subreddit.clone(),
            sort: cfg.sort.clone(),
            token: Mutex::new(None),
        })
    }

    /// Current bearer token, fetching a new one when missing or stale.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(tok.value.clone());
        }

        let resp: TokenResponse = self
            .auth
            .post_form(
                "api/v1/access_token",
                &[("grant_type", "client_credentials")],
                RequestOpts {
                    auth: Some(Auth::Basic {
                        username: &self.client_id,
                        password: &self.client_secret,
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(remote)?;

        let value = match (resp.access_token, resp.error) {
            (Some(tok), _) if !tok.is_empty() => tok,
            (_, Some(err)) => {
                return Err(HarvestError::Transport(format!(
                    "reddit token request rejected: {err}"
                )));
            }
            _ => {
                return Err(HarvestError::Decode(
                    "reddit token response carried no access_token".into(),
                ));
            }
        };
        let ttl = Duration::from_secs(resp.expires_in.unwrap_or(DEFAULT_TOKEN_TTL));
        tracing::debug!(ttl_secs = ttl.as_secs(), "reddit.token.refreshed");
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_SLACK),
        });
        Ok(value)
    }

    async fn get<T>(&self, path: &str, query: Vec<(&str, Cow<'_, str>)>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.access_token().await?;
        let mut query = query;
        query.push(("raw_json", "1".into()));
        self.api
            .get_json(
                path,
                RequestOpts {
                    auth: Some(Auth::Bearer(&token)),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await
            .map_err(remote)
    }

    /// One page of link search results in the configured subreddit.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        after: Option<&str>,
    ) -> Result<Listing<PostThing>> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", query.into()),
            ("sort", self.sort.as_str().into()),
            ("restrict_sr", "on".into()),
            ("type", "link".into()),
            ("limit", limit.to_string().into()),
        ];
        if let Some(after) = after {
            params.push(("after", after.into()));
        }
        let path = format!("r/{}/search", self.subreddit);
        self.get(&path, params).await
    }

    /// The first, partially expanded comment listing of a post.
    pub async fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentThing>> {
        let (_post, comments): CommentTreeResponse = self
            .get(
                &format!("comments/{post_id}"),
                vec![("limit", COMMENT_TREE_LIMIT.into())],
            )
            .await?;
        Ok(comments.data.children)
    }
}

#[async_trait]
impl MoreFetcher for RedditApi {
    async fn more_children(&self, post_id: &str, ids: &[String]) -> Result<Vec<CommentThing>> {
        let link_id = format!("t3_{post_id}");
        let resp: MoreChildrenResponse = self
            .get(
                "api/morechildren",
                vec![
                    ("api_type", "json".into()),
                    ("link_id", link_id.into()),
                    ("children", ids.join(",").into()),
                    ("limit_children", "false".into()),
                ],
            )
            .await?;
        if !resp.json.errors.is_empty() {
            return Err(HarvestError::Transport(format!(
                "reddit morechildren failed: {}",
                serde_json::Value::from(resp.json.errors)
            )));
        }
        Ok(resp.json.data.map(|d| d.things).unwrap_or_default())
    }

    async fn continue_thread(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentThing>> {
        let (_post, listing): CommentTreeResponse = self
            .get(
                &format!("comments/{post_id}/_/{comment_id}"),
                vec![("limit", COMMENT_TREE_LIMIT.into())],
            )
            .await?;

        // The listing is rooted at the comment itself; we only want what hangs below it.
        let mut replies = Vec::new();
        for thing in listing.data.children {
            match thing {
                CommentThing::Comment(root) if root.id == comment_id => {
                    replies.extend(root.replies.into_children());
                }
                other => replies.push(other),
            }
        }
        Ok(replies)
    }
}
