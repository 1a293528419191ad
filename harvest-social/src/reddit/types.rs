use serde::Deserialize;

/// `{"kind": "Listing", "data": {"after": ..., "children": [...]}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default = "Vec::new")]
    pub children: Vec<T>,
}

/// A `t3` entry of a search listing. The kind tag is not checked.
#[derive(Debug, Clone, Deserialize)]
pub struct PostThing {
    pub data: PostData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostData {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub num_comments: Option<u64>,
}

/// Entries of a comment listing: a concrete comment or a "load more" stub.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(CommentData),
    #[serde(rename = "more")]
    More(MoreData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    pub id: String,
    /// Fullname of the replied-to thing (`t1_...` or `t3_...`).
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub replies: Replies,
}

/// Reddit sends `""` for a comment without replies and a listing otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Replies {
    Listing(Listing<CommentThing>),
    Empty(serde_json::Value),
}

impl Default for Replies {
    fn default() -> Self {
        Self::Empty(serde_json::Value::Null)
    }
}

impl Replies {
    pub fn into_children(self) -> Vec<CommentThing> {
        match self {
            Self::Listing(listing) => listing.data.children,
            Self::Empty(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreData {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

impl MoreData {
    /// "Continue this thread" stubs carry no ids; their comments are only
    /// reachable by re-fetching the thread rooted at the parent comment.
    pub fn is_continue_thread(&self) -> bool {
        self.id == "_" || self.children.is_empty()
    }
}

/// `GET /comments/{id}` answers with `[post listing, comment listing]`.
pub type CommentTreeResponse = (Listing<PostThing>, Listing<CommentThing>);

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<CommentThing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comment_listing_decodes_nested_replies_and_stubs() {
        let v = json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    {"kind": "t1", "data": {
                        "id": "c1", "parent_id": "t3_p", "author": "ink_fan",
                        "body": "writes well", "score": 7, "created_utc": 1672531200.0,
                        "replies": {"kind": "Listing", "data": {"after": null, "children": [
                            {"kind": "t1", "data": {"id": "c2", "parent_id": "t1_c1",
                              "author": "[deleted]", "body": "[removed]", "score": 0,
                              "created_utc": 1672531260.0, "replies": ""}}
                        ]}}
                    }},
                    {"kind": "more", "data": {"id": "m1", "parent_id": "t3_p",
                      "count": 12, "children": ["c3", "c4"]}}
                ]
            }
        });
        let listing: Listing<CommentThing> = serde_json::from_value(v).unwrap();
        let mut children = listing.data.children.into_iter();

        let Some(CommentThing::Comment(c1)) = children.next() else {
            panic!("expected a comment first");
        };
        assert_eq!(c1.score, Some(7));
        let replies = c1.replies.into_children();
        assert_eq!(replies.len(), 1);

        let Some(CommentThing::More(more)) = children.next() else {
            panic!("expected a more stub second");
        };
        assert_eq!(more.children, vec!["c3", "c4"]);
        assert!(!more.is_continue_thread());
    }

    #[test]
    fn continue_thread_stub_is_recognized() {
        let more: MoreData = serde_json::from_value(json!({
            "id": "_", "parent_id": "t1_deep", "count": 0, "children": []
        }))
        .unwrap();
        assert!(more.is_continue_thread());
    }
}
