mod devto;
mod feed;
mod posts;
mod stats;

use clap::{Parser, Subcommand};
use folio_core::{ActivitySource, PostSort};

#[derive(Debug, Parser)]
#[command(name = "folio-cli")]
#[command(about = "Inspect the folio activity feed, posts and engagement counters")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Aggregate every configured source and print the timeline
    Feed {
        /// Only show these sources (comma separated: blog,github,devto,reading,...)
        #[arg(long, value_delimiter = ',')]
        source: Vec<ActivitySource>,

        /// Maximum number of items to print
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List published posts from the content directory
    Posts {
        #[arg(long)]
        tag: Option<String>,

        /// Case-insensitive search over title, summary and tags
        #[arg(long)]
        q: Option<String>,

        /// newest, oldest, title or popular
        #[arg(long, value_parser = parse_sort, default_value = "newest")]
        sort: PostSort,
    },
    /// Show engagement counters for one or more posts (Postgres store)
    Stats {
        #[arg(required = true)]
        slugs: Vec<String>,
    },
    /// Delete view history older than the retention window (Postgres store)
    Prune,
    /// Show DEV.to articles and their reactions for a user
    Devto { username: String },
}

fn parse_sort(raw: &str) -> Result<PostSort, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "newest" => Ok(PostSort::Newest),
        "oldest" => Ok(PostSort::Oldest),
        "title" => Ok(PostSort::Title),
        "popular" => Ok(PostSort::Popular),
        other => Err(format!(
            "unknown sort '{other}'; expected newest, oldest, title or popular"
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("folio-cli: run with --help to list commands");
        return Ok(());
    };

    let config = folio_core::load_app_config()?;
    match command {
        Commands::Feed {
            source,
            limit,
            json,
        } => feed::run_feed(&config, &source, limit, json).await,
        Commands::Posts { tag, q, sort } => posts::run_posts(&config, tag, q, sort).await,
        Commands::Stats { slugs } => stats::run_stats(&config, &slugs).await,
        Commands::Prune => stats::run_prune(&config).await,
        Commands::Devto { username } => devto::run_devto(&config, &username).await,
    }
}
