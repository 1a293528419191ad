use crate::youtube::types::{CommentThread, SearchResult};
use chrono::{DateTime, Utc};
use harvest_common::{Comment, ParentItem};

/// `None` for results that are not videos.
pub fn search_result_to_parent(result: SearchResult) -> Option<ParentItem> {
    let id = result.id.video_id.filter(|id| !id.is_empty())?;
    let snippet = result.snippet;
    Some(ParentItem {
        id,
        title: snippet.as_ref().and_then(|s| s.title.clone()),
        author: snippet.as_ref().and_then(|s| s.channel_title.clone()),
        created: snippet
            .as_ref()
            .and_then(|s| s.published_at.as_deref())
            .and_then(parse_rfc3339),
    })
}

/// The thread's top-level comment; replies are not collected.
pub fn thread_to_comment(video_id: &str, thread: CommentThread) -> Comment {
    let top = thread.snippet.top_level_comment;
    let snippet = top.snippet;
    Comment {
        id: top.id,
        parent_id: video_id.to_string(),
        author: snippet.author_display_name.filter(|a| !a.is_empty()),
        body: snippet
            .text_display
            .or(snippet.text_original)
            .unwrap_or_default(),
        score: snippet.like_count.unwrap_or_default(),
        created: snippet.published_at.as_deref().and_then(parse_rfc3339),
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
