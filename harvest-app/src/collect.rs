//! Wires the platform clients into the shared pipeline.
use crate::cli::Command;
use anyhow::{Context, Result};
use harvest_config::HarvestConfig;
use harvest_pipeline::{
    DiscussionSchema, ExpandOptions, NameCount, RunOptions, RunReport, VideoSchema, run_pipeline,
};
use harvest_social::reddit::{MoreLimits, RedditApi, RedditComments, RedditSearch};
use harvest_social::youtube::{YoutubeApi, YoutubeComments, YoutubeSearch};

pub async fn run(command: &Command, cfg: &HarvestConfig) -> Result<RunReport> {
    let expand = ExpandOptions {
        policy: cfg.expansion.failure_policy,
        concurrency: cfg.expansion.concurrency,
    };

    match command {
        Command::Reddit { query, max_posts } => {
            cfg.validate_reddit()?;
            let api = RedditApi::new(&cfg.reddit, &cfg.http)?;
            let limits = MoreLimits {
                max_requests: cfg.reddit.max_more_requests,
                max_depth: cfg.reddit.max_more_depth,
            };
            let opts = RunOptions {
                pipeline: "reddit",
                query: query.clone(),
                ceiling: *max_posts,
                expand,
                output_root: cfg.output_dir.clone(),
                name_count: NameCount::Ceiling,
            };
            run_pipeline::<_, _, DiscussionSchema>(
                RedditSearch::new(&api, query.as_str()),
                &RedditComments::new(&api, limits),
                &opts,
            )
            .await
            .with_context(|| format!("reddit collection for {query:?} failed"))
        }
        Command::Youtube {
            query, max_videos, ..
        } => {
            cfg.validate_youtube()?;
            let api = YoutubeApi::new(&cfg.youtube, &cfg.http)?;
            let opts = RunOptions {
                pipeline: "youtube",
                query: query.clone(),
                ceiling: *max_videos,
                expand,
                output_root: cfg.output_dir.clone(),
                name_count: NameCount::Rows,
            };
            run_pipeline::<_, _, VideoSchema>(
                YoutubeSearch::new(&api, query.as_str()),
                &YoutubeComments::new(&api, cfg.youtube.max_comments_per_video),
                &opts,
            )
            .await
            .with_context(|| format!("youtube collection for {query:?} failed"))
        }
    }
}
