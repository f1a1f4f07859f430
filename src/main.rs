use clap::{Parser, Subcommand};

use git_authorship::commands;
use git_authorship::commands::annotate::AnnotateArgs;
use git_authorship::commands::events::EventsArgs;
use git_authorship::config::Config;
use git_authorship::git::find_repository;
use git_authorship::observability::{self, log_message};
use git_authorship::stats::filter::MatchMode;

#[derive(Parser)]
#[command(name = "git-authorship", version)]
#[command(about = "Line-level AI/human authorship for git repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-line authorship for a file
    Blame {
        file: String,
        /// Ignore history after this revision
        #[arg(long)]
        newest_commit: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// AI/human line counts for one or more files
    Stats {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the authorship record of a commit
    Show { commit: String },
    /// Summarize authorship records for a revision range
    Range { range: String },
    /// List every commit with an authorship record
    List,
    /// Add an author for a file to a commit's record
    Annotate {
        commit: String,
        #[arg(long)]
        file: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        ai: bool,
        #[arg(long, requires = "ai")]
        model: Option<String>,
    },
    /// Activity report from the tracking event log
    Events {
        /// Only events within this duration of now, e.g. "30days"
        #[arg(long)]
        since: Option<String>,
        /// Branch pattern; exact match unless --glob or --regex
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, conflicts_with = "regex")]
        glob: bool,
        #[arg(long)]
        regex: bool,
        #[arg(short = 'i', long = "ignore-case")]
        ignore_case: bool,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load();

    let repo = match find_repository(&config) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Not in a git repository: {}", e);
            std::process::exit(1);
        }
    };
    observability::set_repo_context(&repo);

    let result = match cli.command {
        Commands::Blame {
            file,
            newest_commit,
            json,
        } => commands::blame::handle_blame(&repo, &config, &file, newest_commit.as_deref(), json),
        Commands::Stats { files, json } => {
            log_message("stats", "info", None);
            commands::stats::handle_stats(&repo, &config, &files, json)
        }
        Commands::Show { commit } => commands::show::handle_show(&repo, &config, &commit),
        Commands::Range { range } => commands::show::handle_range(&repo, &config, &range),
        Commands::List => commands::show::handle_list(&repo, &config),
        Commands::Annotate {
            commit,
            file,
            author,
            ai,
            model,
        } => commands::annotate::handle_annotate(
            &repo,
            &config,
            &AnnotateArgs {
                commit,
                file,
                author,
                ai,
                model,
            },
        )
        .map(|_| ()),
        Commands::Events {
            since,
            branch,
            glob,
            regex,
            ignore_case,
            json,
        } => {
            let mode = if regex {
                MatchMode::Regex
            } else if glob {
                MatchMode::Glob
            } else {
                MatchMode::Exact
            };
            commands::events::handle_events(
                &repo,
                &config,
                &EventsArgs {
                    since,
                    branch,
                    mode,
                    case_insensitive: ignore_case,
                    json,
                },
            )
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
