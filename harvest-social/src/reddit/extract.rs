use crate::reddit::types::{CommentData, PostData};
use chrono::{DateTime, Utc};
use harvest_common::{Comment, ParentItem};

/// Reddit shows this in place of the author of removed or deleted content.
const DELETED: &str = "[deleted]";

pub fn post_to_parent(post: PostData) -> ParentItem {
    ParentItem {
        id: post.id,
        title: post.title,
        author: known_author(post.author),
        created: post.created_utc.and_then(from_epoch),
    }
}

/// `post_id` is the owning post, not the replied-to comment.
pub fn comment_from_wire(post_id: &str, data: CommentData) -> Comment {
    Comment {
        id: data.id,
        parent_id: post_id.to_string(),
        author: known_author(data.author),
        body: data.body,
        score: data.score.unwrap_or_default(),
        created: data.created_utc.and_then(from_epoch),
    }
}

fn known_author(author: Option<String>) -> Option<String> {
    author.filter(|a| !a.is_empty() && a != DELETED)
}

/// `created_utc` arrives as a float of whole seconds.
fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}
