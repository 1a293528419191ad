//! Flatten expansions into numbered rows and persist them as CSV.
//!
//! Rows are numbered from 1 in (parent, comment) arrival order. Every text
//! field is folded onto one line so a record never spans physical lines.
//! Files are written to a temporary sibling and renamed into place, so a
//! reader sees either no file or the complete one.
use crate::expand::Expansion;
use chrono::SecondsFormat;
use harvest_common::{Comment, HarvestError, ParentItem, Result, single_line};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Placeholder written for comments whose author is gone.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Column layout of one pipeline's output file.
pub trait RowSchema {
    /// Header row, in field order of [`RowSchema::Row`].
    const HEADER: &'static [&'static str];

    type Row: Serialize;

    fn row(seq: u64, parent: &ParentItem, comment: &Comment) -> Self::Row;
}

/// `id,parent_id,parent_title,comment_id,author,comment_body,score,created_utc`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscussionRow {
    pub id: u64,
    pub parent_id: String,
    pub parent_title: String,
    pub comment_id: String,
    pub author: String,
    pub comment_body: String,
    pub score: i64,
    /// Unix seconds.
    pub created_utc: Option<i64>,
}

/// Reddit-style threads: one row per comment, joined with its post.
pub enum DiscussionSchema {}

impl RowSchema for DiscussionSchema {
    const HEADER: &'static [&'static str] = &[
        "id",
        "parent_id",
        "parent_title",
        "comment_id",
        "author",
        "comment_body",
        "score",
        "created_utc",
    ];

    type Row = DiscussionRow;

    fn row(seq: u64, parent: &ParentItem, comment: &Comment) -> DiscussionRow {
        DiscussionRow {
            id: seq,
            parent_id: parent.id.clone(),
            parent_title: single_line(parent.title.as_deref().unwrap_or_default()).into_owned(),
            comment_id: comment.id.clone(),
            author: single_line(comment.author.as_deref().unwrap_or(DELETED_AUTHOR)).into_owned(),
            comment_body: single_line(&comment.body).into_owned(),
            score: comment.score,
            created_utc: comment.created.map(|t| t.timestamp()),
        }
    }
}

/// `id,video_id,author,text,published_at,like_count`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRow {
    pub id: u64,
    pub video_id: String,
    pub author: String,
    pub text: String,
    /// RFC 3339, second precision, `Z` suffix.
    pub published_at: Option<String>,
    pub like_count: i64,
}

/// Video comment threads: one row per top-level comment.
pub enum VideoSchema {}

impl RowSchema for VideoSchema {
    const HEADER: &'static [&'static str] = &[
        "id",
        "video_id",
        "author",
        "text",
        "published_at",
        "like_count",
    ];

    type Row = VideoRow;

    fn row(seq: u64, parent: &ParentItem, comment: &Comment) -> VideoRow {
        VideoRow {
            id: seq,
            video_id: parent.id.clone(),
            author: single_line(comment.author.as_deref().unwrap_or_default()).into_owned(),
            text: single_line(&comment.body).into_owned(),
            published_at: comment
                .created
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            like_count: comment.score,
        }
    }
}

/// Number every comment of every expansion, starting at 1.
pub fn flatten<R: RowSchema>(expansions: &[Expansion]) -> Vec<R::Row> {
    expansions
        .iter()
        .flat_map(|exp| exp.comments.iter().map(move |c| (&exp.parent, c)))
        .zip(1u64..)
        .map(|((parent, comment), seq)| R::row(seq, parent, comment))
        .collect()
}

/// Which number ends up in the output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCount {
    /// The requested result ceiling.
    Ceiling,
    /// The number of data rows written.
    Rows,
}

/// Make a query safe to embed in a file name.
///
/// Whitespace and path-hostile characters become `_`.
pub fn sanitize_query(query: &str) -> String {
    let cleaned: String = query
        .trim()
        .chars()
        .map(|c| {
            let hostile = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
            if hostile || c.is_whitespace() || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// `{root}/{pipeline}/{pipeline}_comments_{query}_{count}.csv`
pub fn output_path(root: &Path, pipeline: &str, query: &str, count: usize) -> PathBuf {
    root.join(pipeline).join(format!(
        "{pipeline}_comments_{}_{count}.csv",
        sanitize_query(query)
    ))
}

/// Write the header and `rows` to `path` atomically, creating parent dirs.
pub fn write_rows<R: RowSchema>(path: &Path, rows: &[R::Row]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut tmp);
        writer.write_record(R::HEADER).map_err(output_err)?;
        for row in rows {
            writer.serialize(row).map_err(output_err)?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path)
        .map_err(|e| HarvestError::Output(format!("persist {}: {}", path.display(), e.error)))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "sink.written");
    Ok(())
}

fn output_err(err: csv::Error) -> HarvestError {
    HarvestError::Output(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn parent(id: &str, title: &str) -> ParentItem {
        ParentItem {
            id: id.into(),
            title: Some(title.into()),
            author: None,
            created: None,
        }
    }

    fn comment(id: &str, parent_id: &str, body: &str) -> Comment {
        Comment {
            id: id.into(),
            parent_id: parent_id.into(),
            author: Some("inky".into()),
            body: body.into(),
            score: 3,
            created: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()),
        }
    }

    fn expansion(p: ParentItem, comments: Vec<Comment>) -> Expansion {
        Expansion {
            parent: p,
            comments,
            skipped: None,
        }
    }

    #[test]
    fn flatten_numbers_across_parents() {
        let exps = vec![
            expansion(
                parent("a", "A"),
                vec![comment("c1", "a", "x"), comment("c2", "a", "y")],
            ),
            expansion(parent("b", "B"), vec![]),
            expansion(parent("c", "C"), vec![comment("c3", "c", "z")]),
        ];

        let rows = flatten::<DiscussionSchema>(&exps);

        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows[2].parent_id, "c");
        assert_eq!(rows[2].parent_title, "C");
    }

    #[test]
    fn discussion_row_folds_text_and_marks_deleted_authors() {
        let mut c = comment("c1", "a", "line one\nline two\r\nthree");
        c.author = None;
        let row = DiscussionSchema::row(1, &parent("a", "multi\nline title"), &c);

        assert_eq!(row.comment_body, "line one line two three");
        assert_eq!(row.parent_title, "multi line title");
        assert_eq!(row.author, DELETED_AUTHOR);
        assert_eq!(row.created_utc, Some(1714566600));
    }

    #[test]
    fn video_row_formats_timestamp() {
        let row = VideoSchema::row(7, &parent("vid", "t"), &comment("c", "vid", "hi"));
        assert_eq!(row.published_at.as_deref(), Some("2024-05-01T12:30:00Z"));
        assert_eq!(row.like_count, 3);
        assert_eq!(row.video_id, "vid");
    }

    #[test]
    fn sanitize_replaces_spaces_and_separators() {
        assert_eq!(sanitize_query("bic cristal"), "bic_cristal");
        assert_eq!(sanitize_query("  sailor pro gear "), "sailor_pro_gear");
        assert_eq!(sanitize_query("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_query("   "), "_");
    }

    #[test]
    fn output_path_layout() {
        let p = output_path(Path::new("out"), "reddit", "bic cristal", 1000);
        assert_eq!(
            p,
            PathBuf::from("out/reddit/reddit_comments_bic_cristal_1000.csv")
        );
    }

    #[test]
    fn header_written_even_without_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("youtube").join("empty.csv");

        write_rows::<VideoSchema>(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,video_id,author,text,published_at,like_count\n");
    }

    #[test]
    fn written_rows_stay_on_one_line_each() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let exps = vec![expansion(
            parent("a", "A"),
            vec![
                comment("c1", "a", "first\nsecond"),
                comment("c2", "a", "plain, with comma"),
            ],
        )];

        write_rows::<DiscussionSchema>(&path, &flatten::<DiscussionSchema>(&exps)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,parent_id,parent_title,comment_id,author,comment_body,score,created_utc"
        );
        assert_eq!(lines[1], "1,a,A,c1,inky,first second,3,1714566600");
        assert_eq!(lines[2], "2,a,A,c2,inky,\"plain, with comma\",3,1714566600");
    }

    #[test]
    fn unicode_line_separators_are_folded_in_written_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let exps = vec![expansion(
            parent("v1", "Pilot review"),
            vec![comment("c1", "v1", "nice\u{2028}nib\u{85}really\u{2029}")],
        )];

        write_rows::<VideoSchema>(&path, &flatten::<VideoSchema>(&exps)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains(['\u{85}', '\u{2028}', '\u{2029}']));
        assert!(text.contains("nice nib really "));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn rewrite_replaces_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        std::fs::write(&path, "stale").unwrap();

        write_rows::<VideoSchema>(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,video_id"));
        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
