use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use pipfind::{
    Config, Field, IndexCache, OutputMode, Prefix, PypiApi, SearchOptions, Searcher, Substring,
    cache, colors, progress,
};
use std::io::{IsTerminal, Write};

#[derive(Parser)]
#[command(name = "pipfind")]
#[command(author, version, about = "Offline search over the PyPI package index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search package names, optionally with version and summary
    Search(SearchArgs),

    /// Download a fresh copy of the package index
    Update,

    /// Show cache location and usage
    Cache {
        /// Remove all cached data
        #[arg(long)]
        clean: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Text to look for in package names (omit to list every package)
    query: Option<String>,

    /// Fields to show, comma separated
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "name")]
    fields: Vec<Field>,

    /// Shorthand for --fields name,version,summary
    #[arg(short, long, conflicts_with = "fields")]
    long: bool,

    /// Only show the closest match by edit distance
    #[arg(short, long)]
    nearest: bool,

    /// Output format (defaults to pretty-aligned on a terminal, pretty otherwise)
    #[arg(short, long, value_enum)]
    output: Option<OutputMode>,

    /// Fetch metadata even when only names are shown
    #[arg(short, long)]
    metadata: bool,

    /// Refresh the package index before searching
    #[arg(short, long)]
    refresh: bool,

    /// Refetch metadata for every match, ignoring the cache
    #[arg(short = 'R', long)]
    refresh_metadata: bool,

    /// Match names by prefix instead of substring
    #[arg(long)]
    prefix: bool,

    /// Match case-sensitively
    #[arg(short, long)]
    case_sensitive: bool,

    /// Parallel metadata fetches (defaults to available cores)
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    colors::init_colors();

    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Search(args) => {
            if let Some(jobs) = args.jobs {
                config.jobs = jobs.max(1);
            }
            search(&config, args).await?;
        }
        Commands::Update => update(&config).await?,
        Commands::Cache { clean } => cache_info(&config, clean)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pipfind", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let api = PypiApi::new(config)?;

    let fields = if args.long {
        vec![Field::Name, Field::Version, Field::Summary]
    } else {
        args.fields
    };
    let output_mode = args.output.unwrap_or(if is_tty {
        OutputMode::PrettyAligned
    } else {
        OutputMode::Pretty
    });

    let options = SearchOptions {
        refresh_index: args.refresh,
        query: args.query.clone(),
        fields,
        nearest_match_only: args.nearest,
        output_mode,
        metadata_required: args.metadata,
        force_metadata_refresh: args.refresh_metadata,
    };

    let searcher = Searcher::new(config, &api).with_progress(true);
    let searcher = if args.prefix {
        searcher.with_matcher(Prefix {
            case_sensitive: args.case_sensitive,
        })
    } else {
        searcher.with_matcher(Substring {
            case_sensitive: args.case_sensitive,
        })
    };

    let outcome = searcher.run(&options).await?;

    if outcome.count == 0 {
        if std::io::stderr().is_terminal() {
            eprintln!(
                "{} No packages found matching '{}'",
                "✗".red(),
                args.query.as_deref().unwrap_or_default()
            );
        }
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.output.as_bytes())?;
    stdout.flush()?;

    Ok(())
}

async fn update(config: &Config) -> anyhow::Result<()> {
    let api = PypiApi::new(config)?;
    let index = IndexCache::new(config, &api);

    let spinner = progress::spinner("Downloading package index...");
    let result = index.refresh().await;
    spinner.finish_and_clear();

    let count = result?;
    println!(
        "{} Indexed {} packages in {}",
        "✓".green(),
        count.to_string().bold(),
        index.path().display().to_string().dimmed()
    );
    Ok(())
}

fn cache_info(config: &Config, clean: bool) -> anyhow::Result<()> {
    if clean {
        let removed = cache::clear_caches(config)?;
        println!(
            "{} Removed {} cached files",
            "✓".green().bold(),
            removed.to_string().bold()
        );
        return Ok(());
    }

    let stats = cache::cache_stats(config)?;

    println!("{}", "==> Cache".bold().green());
    println!(
        "{}: {}",
        "Location".bold(),
        config.cache_dir.display().to_string().cyan()
    );

    match stats.index_modified {
        Some(modified) => {
            let when = chrono::DateTime::<chrono::Local>::from(modified)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            let fresh = cache::is_fresh(&config.index_path(), config.ttl_index, config.now());
            let status = if fresh { "fresh".green() } else { "stale".yellow() };
            println!(
                "{}: {} packages, updated {} ({})",
                "Index".bold(),
                stats.index_entries.to_string().cyan(),
                when.cyan(),
                status
            );
        }
        None => println!("{}: {}", "Index".bold(), "not downloaded".dimmed()),
    }

    println!(
        "{}: {} records, {}",
        "Metadata".bold(),
        stats.metadata_records.to_string().cyan(),
        cache::format_size(stats.metadata_bytes).cyan()
    );

    if stats.index_modified.is_some() || stats.metadata_records > 0 {
        println!();
        println!("Run {} to clear the cache", "pipfind cache --clean".dimmed());
    }

    Ok(())
}
