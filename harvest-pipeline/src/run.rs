//! The three stages wired together: query, expand, sink.
use crate::expand::{CommentSource, ExpandOptions, expand};
use crate::paging::{BoundedCursor, PagedEndpoint};
use crate::sink::{NameCount, RowSchema, flatten, output_path, write_rows};
use harvest_common::{ParentItem, Result};
use std::path::PathBuf;
use std::time::Instant;

/// Everything one pipeline run needs besides its endpoints.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Short pipeline name; also the output subdirectory and file prefix.
    pub pipeline: &'static str,
    pub query: String,
    /// Maximum number of parents taken from the search.
    pub ceiling: usize,
    pub expand: ExpandOptions,
    pub output_root: PathBuf,
    pub name_count: NameCount,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub path: PathBuf,
    pub parents: usize,
    pub rows: usize,
    /// Ids of parents whose comments could not be fetched.
    pub skipped: Vec<String>,
}

/// Run query → expansion → sink.
///
/// A query-stage failure is always fatal. Expansion failures follow
/// `opts.expand.policy`. The output file is only written once every parent
/// has been processed.
pub async fn run_pipeline<S, C, R>(search: S, comments: &C, opts: &RunOptions) -> Result<RunReport>
where
    S: PagedEndpoint<Item = ParentItem>,
    C: CommentSource + ?Sized,
    R: RowSchema,
{
    let started = Instant::now();
    tracing::info!(
        pipeline = opts.pipeline,
        query = %opts.query,
        ceiling = opts.ceiling,
        "run.start"
    );

    let parents = BoundedCursor::new(search, opts.ceiling).collect().await?;
    tracing::info!(
        pipeline = opts.pipeline,
        parents = parents.len(),
        "run.query.done"
    );

    let expansions = expand(comments, parents, opts.expand).await?;
    let skipped: Vec<String> = expansions
        .iter()
        .filter(|exp| exp.skipped.is_some())
        .map(|exp| exp.parent.id.clone())
        .collect();

    let rows = flatten::<R>(&expansions);
    let count = match opts.name_count {
        NameCount::Ceiling => opts.ceiling,
        NameCount::Rows => rows.len(),
    };
    let path = output_path(&opts.output_root, opts.pipeline, &opts.query, count);
    write_rows::<R>(&path, &rows)?;

    let report = RunReport {
        path,
        parents: expansions.len(),
        rows: rows.len(),
        skipped,
    };
    tracing::info!(
        pipeline = opts.pipeline,
        parents = report.parents,
        rows = report.rows,
        skipped = report.skipped.len(),
        path = %report.path.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run.done"
    );
    Ok(report)
}
