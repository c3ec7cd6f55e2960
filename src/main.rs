use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrap::render;
use scrap::scrapyard::find_root;
use scrap::{Config, Scrapyard};

#[derive(Parser)]
#[command(name = "scrap")]
#[command(about = "Move files out of the way into a git-ignored .scrap/ directory")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files or directories to scrap
    paths: Vec<PathBuf>,

    /// Working root (defaults to the enclosing git repository, or the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Do not touch .gitignore
    #[arg(long, global = true)]
    no_gitignore: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List scrapped items
    List {
        /// Show the contents of scrapped directories
        #[arg(long)]
        tree: bool,

        /// Maximum depth for --tree
        #[arg(long, default_value = "3")]
        depth: usize,
    },
    /// Search scrapped items by name or original path
    Find { query: String },
    /// Move a scrapped item back
    Restore {
        /// Name inside the scrap directory
        name: String,

        /// Restore to this path instead of the original location
        #[arg(long)]
        to: Option<PathBuf>,

        /// Overwrite an existing file at the destination
        #[arg(short, long)]
        force: bool,
    },
    /// Permanently delete scrapped items
    Purge {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Permanently delete items scrapped more than N days ago
    Clean {
        /// Age in days (defaults to the configured default_clean_days)
        #[arg(long)]
        older_than: Option<u32>,
    },
    /// Permanently delete everything in the scrap directory
    Empty {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Show what happened to scrapped items, most recent first
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Summarize the scrap directory
    Status,
    /// Show the effective configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Initialize tracing with output to stderr so stdout carries only command output
fn init_tracing(verbose: bool) {
    let default = if verbose { "scrap=debug" } else { "scrap=warn" };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Paths on the command line are relative to the current directory, not the root.
fn from_cwd(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load();
    if cli.no_gitignore {
        config.update_gitignore = false;
    }

    if let Some(Commands::Config { init }) = &cli.command {
        if *init {
            let path = scrap::config::get_config_path()?;
            if path.exists() {
                println!("{} already exists", path.display());
            } else {
                let path = Config::default().save()?;
                println!("Wrote {}", path.display());
            }
        }
        return print_json(&config);
    }

    if cli.command.is_none() && cli.paths.is_empty() {
        anyhow::bail!("Nothing to scrap. Pass one or more paths, or see --help");
    }

    let cwd = std::env::current_dir()?;
    let root = match cli.root {
        Some(ref root) => from_cwd(&cwd, root),
        None => find_root(&cwd),
    };
    let read_only = matches!(
        cli.command,
        Some(Commands::List { .. } | Commands::Find { .. } | Commands::History { .. } | Commands::Status)
    );
    let yard = if read_only {
        Scrapyard::open_read_only(&root, &config)?
    } else {
        Scrapyard::open(&root, &config)?
    };

    match cli.command {
        None => {
            let paths: Vec<PathBuf> = cli.paths.iter().map(|p| from_cwd(&cwd, p)).collect();

            let mut scrapped = Vec::new();
            let mut failures = 0;
            for (path, result) in yard.scrap_many(&paths) {
                match result {
                    Ok(entry) => {
                        if !cli.json {
                            if entry.original_path.ends_with(&entry.name) {
                                println!("scrapped {}", entry.original_path);
                            } else {
                                println!("scrapped {} as {}", entry.original_path, entry.name);
                            }
                        }
                        scrapped.push(entry);
                    }
                    Err(e) => {
                        tracing::debug!("Failed to scrap {}: {}", path.display(), e);
                        eprintln!("scrap: {}", e);
                        failures += 1;
                    }
                }
            }
            if cli.json {
                print_json(&scrapped)?;
            }
            if failures > 0 {
                anyhow::bail!("{} path(s) could not be scrapped", failures);
            }
        }
        Some(Commands::List { tree, depth }) => {
            let entries = yard.list()?;
            if cli.json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("Scrap directory is empty");
            } else if tree {
                let nodes: Vec<_> = entries
                    .iter()
                    .map(|e| render::read_tree(&yard.path_of(e), &e.name, depth))
                    .collect();
                print!("{}", render::render_tree(&nodes));
            } else {
                print!("{}", render::render_entries(&entries, chrono::Utc::now()));
            }
            if !cli.json {
                let untracked = yard.untracked()?;
                if !untracked.is_empty() {
                    println!("untracked: {}", untracked.join(", "));
                }
            }
        }
        Some(Commands::Find { query }) => {
            let entries = yard.find(&query)?;
            if cli.json {
                print_json(&entries)?;
            } else {
                print!("{}", render::render_entries(&entries, chrono::Utc::now()));
            }
        }
        Some(Commands::Restore { name, to, force }) => {
            let to = to.map(|p| from_cwd(&cwd, &p));
            let entry = yard.restore(&name, to.as_deref(), force)?;
            if cli.json {
                print_json(&entry)?;
            } else {
                let target = to
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| entry.original_path.clone());
                println!("restored {} to {}", entry.name, target);
            }
        }
        Some(Commands::Purge { names }) => {
            let mut purged = Vec::new();
            for name in &names {
                let entry = yard.purge(name)?;
                if !cli.json {
                    println!("purged {}", entry.name);
                }
                purged.push(entry);
            }
            if cli.json {
                print_json(&purged)?;
            }
        }
        Some(Commands::Clean { older_than }) => {
            let days = older_than.unwrap_or(config.default_clean_days);
            let removed = yard.clean(chrono::Duration::days(days as i64))?;
            if cli.json {
                print_json(&removed)?;
            } else {
                println!(
                    "removed {} item(s) older than {} day(s)",
                    removed.len(),
                    days
                );
            }
        }
        Some(Commands::Empty { yes }) => {
            if !yes {
                anyhow::bail!("Refusing to delete everything without --yes");
            }
            let count = yard.empty()?;
            if cli.json {
                print_json(&serde_json::json!({ "removed": count }))?;
            } else {
                println!("removed {} item(s)", count);
            }
        }
        Some(Commands::History { limit }) => {
            let events = yard.history(Some(limit))?;
            if cli.json {
                print_json(&events)?;
            } else {
                print!("{}", render::render_history(&events));
            }
        }
        Some(Commands::Status) => {
            let status = yard.status()?;
            if cli.json {
                print_json(&status)?;
            } else {
                println!("{}", status.scrap_dir);
                println!(
                    "  {} item(s), {}",
                    status.entries,
                    render::human_size(status.total_bytes)
                );
                if !status.untracked.is_empty() {
                    println!("  {} untracked", status.untracked.len());
                }
                if !status.gitignored {
                    println!("  not listed in .gitignore");
                }
            }
        }
        // Handled before the scrap directory is opened.
        Some(Commands::Config { .. }) => {}
    }

    Ok(())
}
