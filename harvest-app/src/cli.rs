use clap::{Parser, Subcommand, ValueEnum};
use harvest_common::FailurePolicy;
use harvest_config::HarvestConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "harvest")]
#[command(about = "Collect comments on posts and videos matching a keyword into CSV")]
#[command(version)]
pub struct Cli {
    /// Config file; `harvest.yaml` in the working directory is used when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for `reddit/` and `youtube/` output folders.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// What to do when one post's or video's comments cannot be fetched.
    #[arg(long, global = true, value_enum)]
    pub on_error: Option<OnError>,

    /// Posts or videos expanded at once.
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search Reddit posts and collect every comment on each.
    Reddit {
        #[arg(long, short)]
        query: String,
        /// Maximum number of posts taken from the search.
        #[arg(long, default_value_t = 1000)]
        max_posts: usize,
    },
    /// Search YouTube videos and collect their top-level comments.
    Youtube {
        #[arg(long, short)]
        query: String,
        /// Maximum number of videos taken from the search.
        #[arg(long, default_value_t = 1000)]
        max_videos: usize,
        /// Per-video comment ceiling; defaults to `youtube.max_comments_per_video`.
        #[arg(long)]
        max_comments: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    Skip,
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Skip => FailurePolicy::Skip,
            OnError::Abort => FailurePolicy::Abort,
        }
    }
}

impl Cli {
    /// Flags given on the command line beat the config file and env.
    pub fn apply(&self, cfg: &mut HarvestConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(policy) = self.on_error {
            cfg.expansion.failure_policy = policy.into();
        }
        if let Some(n) = self.concurrency {
            cfg.expansion.concurrency = usize::from(n);
        }
        if let Command::Youtube {
            max_comments: Some(n),
            ..
        } = self.command
        {
            cfg.youtube.max_comments_per_video = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_config::HarvestConfigLoader;

    fn base_config() -> HarvestConfig {
        HarvestConfigLoader::new()
            .with_yaml_str("reddit: { client_id: a, client_secret: b }\nyoutube: { api_key: k }")
            .load()
            .unwrap()
    }

    #[test]
    fn reddit_defaults() {
        let cli = Cli::try_parse_from(["harvest", "reddit", "--query", "bic cristal"]).unwrap();
        match cli.command {
            Command::Reddit { query, max_posts } => {
                assert_eq!(query, "bic cristal");
                assert_eq!(max_posts, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli.on_error.is_none());
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "harvest",
            "youtube",
            "-q",
            "sailor pro gear",
            "--max-comments",
            "50",
            "--on-error",
            "abort",
            "--concurrency",
            "4",
            "--output-dir",
            "/tmp/out",
        ])
        .unwrap();
        let mut cfg = base_config();
        cli.apply(&mut cfg);

        assert_eq!(cfg.expansion.failure_policy, FailurePolicy::Abort);
        assert_eq!(cfg.expansion.concurrency, 4);
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.youtube.max_comments_per_video, 50);
    }

    #[test]
    fn zero_concurrency_is_rejected_by_the_parser() {
        let res = Cli::try_parse_from(["harvest", "--concurrency", "0", "reddit", "-q", "x"]);
        assert!(res.is_err());
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["harvest", "youtube"]).is_err());
    }
}
