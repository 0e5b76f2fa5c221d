mod logger;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};

use prchurn_core::{BlameErrorPolicy, ChurnConfig, ChurnReport, OutputFormat, RepoRef};
use prchurn_difflens::filter::PathFilter;
use prchurn_gitpulse::blame::LocalBlame;
use prchurn_review::github::{parse_pr_reference, resolve_token, GitHubClient};
use prchurn_review::pipeline::{ChurnPipeline, PipelineOptions};
use prchurn_review::source::{BlameSource, DiffSource, PullRequestSource};

#[derive(Parser)]
#[command(
    name = "prchurn",
    version,
    about = "Churn risk of a pull request",
    long_about = "Counts how many of the lines a pull request deletes or replaces were\n\
                   themselves changed recently on the destination branch.\n\n\
                   Examples:\n  \
                     prchurn score --pr octocat/hello-world#42       Score a GitHub PR\n  \
                     prchurn score --pr 42 --window-days 30           Owner/repo from .prchurn.toml\n  \
                     git diff main... | prchurn score --diff - --repo-path .\n  \
                     prchurn score --pr 42 --fail-above 50            Gate CI on the score\n  \
                     prchurn init                                     Write .prchurn.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .prchurn.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for the churn report.\n\n\
                       Formats:\n  \
                         text      Score and a per-file summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown for a PR comment"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the churn score of a pull request
    #[command(long_about = "Compute the churn score of a pull request.\n\n\
        Lists the files the PR touches, takes the pre-image lines each patch deletes\n\
        or replaces, blames those files on the destination branch, and counts the\n\
        line positions last changed within the recency window.\n\n\
        PR files come from the GitHub API, or from a unified diff with --diff.\n\
        Blame comes from the GitHub GraphQL API, or from a local clone with --repo-path.\n\n\
        Examples:\n  prchurn score --pr octocat/hello-world#42\n  \
        prchurn score --owner octocat --repo hello-world --pr 42 --branch develop\n  \
        git diff main...feature | prchurn score --diff - --repo-path .")]
    Score {
        /// Pull request: a number, or owner/repo#number
        #[arg(long)]
        pr: Option<String>,

        /// Repository owner (overrides [github].owner)
        #[arg(long)]
        owner: Option<String>,

        /// Repository name (overrides [github].repo)
        #[arg(long)]
        repo: Option<String>,

        /// GitHub token (default: GITHUB_TOKEN, GH_TOKEN, then `gh auth token`)
        #[arg(long)]
        github_token: Option<String>,

        /// GitHub REST API root, for GitHub Enterprise Server
        #[arg(long)]
        api_url: Option<String>,

        /// Destination branch to blame (overrides [history].branch)
        #[arg(long)]
        branch: Option<String>,

        /// Recency window in days (overrides [history].window_days)
        #[arg(long)]
        window_days: Option<u32>,

        /// Maximum blame requests in flight (overrides [history].concurrency)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Read the PR as a unified diff from a file, or `-` for stdin
        #[arg(long, value_name = "FILE")]
        diff: Option<PathBuf>,

        /// Blame with a local clone instead of the GitHub API
        #[arg(long, value_name = "DIR")]
        repo_path: Option<PathBuf>,

        /// What a failed blame fetch does: abort the run or skip the file
        #[arg(long)]
        on_blame_error: Option<BlameErrorPolicy>,

        /// Additional glob patterns to exclude from the score
        #[arg(long)]
        skip_pattern: Vec<String>,

        /// Exit with status 1 if the score is greater than this
        #[arg(long, value_name = "N")]
        fail_above: Option<u64>,
    },
    /// Create a default .prchurn.toml configuration file
    #[command(long_about = "Create a default .prchurn.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .prchurn.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const CONFIG_FILE: &str = ".prchurn.toml";

const DEFAULT_CONFIG: &str = r#"# prchurn configuration

[github]
# owner = "octocat"
# repo = "hello-world"
# api_url = "https://api.github.com"

[history]
# window_days = 90
# branch = "main"
# concurrency = 4
# on_blame_error = "abort"   # or "skip"
# refetch_per_contributor = false

[filter]
# skip_patterns = ["*.lock", "vendor/**"]
"#;

fn load_config(path: Option<&Path>) -> Result<ChurnConfig> {
    let config = match path {
        Some(path) => ChurnConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                ChurnConfig::from_file(default_path)?
            } else {
                ChurnConfig::default()
            }
        }
    };
    Ok(config)
}

fn read_diff_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(format!("reading {}", path.display()))
}

/// Split `--pr` into an optional repository and the PR number.
fn parse_pr_arg(pr: &str) -> Result<(Option<RepoRef>, u64)> {
    if pr.contains('#') {
        let (repo, number) = parse_pr_reference(pr)?;
        return Ok((Some(repo), number));
    }
    let number = pr
        .parse()
        .into_diagnostic()
        .wrap_err(format!("invalid PR '{pr}', expected a number or owner/repo#number"))?;
    Ok((None, number))
}

fn resolve_repo(
    from_pr: Option<RepoRef>,
    owner: Option<String>,
    repo: Option<String>,
    config: &ChurnConfig,
) -> Result<RepoRef> {
    if let Some(repo) = from_pr {
        return Ok(repo);
    }
    let owner = owner.or_else(|| config.github.owner.clone());
    let repo = repo.or_else(|| config.github.repo.clone());
    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok(RepoRef { owner, repo }),
        _ => miette::bail!(
            "repository unknown: pass --pr owner/repo#N, --owner and --repo, or set [github] in {CONFIG_FILE}"
        ),
    }
}

fn blame_progress() -> Result<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return Ok(indicatif::ProgressBar::hidden());
    }
    let pb = indicatif::ProgressBar::new(0);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} blaming files {pos}/{len} ({elapsed})",
        )
        .into_diagnostic()?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(pb)
}

async fn run_score<P: PullRequestSource, B: BlameSource>(
    prs: &P,
    blame: &B,
    pr_number: u64,
    options: PipelineOptions,
    filter: PathFilter,
) -> Result<ChurnReport> {
    let report = ChurnPipeline::new(blame, options)
        .with_filter(filter)
        .with_progress(blame_progress()?)
        .compute_churn(prs, pr_number)
        .await?;
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .color(use_color)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();
    logger::init(cli.verbose, use_color)?;

    match cli.command {
        Command::Score {
            pr,
            owner,
            repo,
            github_token,
            api_url,
            branch,
            window_days,
            concurrency,
            diff,
            repo_path,
            on_blame_error,
            skip_pattern,
            fail_above,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(branch) = branch {
                config.history.branch = branch;
            }
            if let Some(days) = window_days {
                config.history.window_days = days;
            }
            if let Some(n) = concurrency {
                config.history.concurrency = n;
            }
            if let Some(policy) = on_blame_error {
                config.history.on_blame_error = policy;
            }
            if let Some(url) = api_url {
                config.github.api_url = url;
            }
            config.filter.skip_patterns.extend(skip_pattern);

            let (pr_repo, pr_number) = match pr.as_deref() {
                Some(pr) => {
                    let (repo, number) = parse_pr_arg(pr)?;
                    (repo, Some(number))
                }
                None => (None, None),
            };
            if diff.is_none() && pr_number.is_none() {
                miette::bail!("--pr is required unless the PR is given with --diff");
            }

            let diff_source = match &diff {
                Some(path) => Some(DiffSource::parse(&read_diff_input(path)?)?),
                None => None,
            };
            let local_blame = repo_path.map(LocalBlame::new);

            let github = if diff_source.is_none() || local_blame.is_none() {
                let repo = resolve_repo(pr_repo, owner, repo, &config)?;
                let token = resolve_token(github_token.as_deref())?;
                Some(GitHubClient::new(&token, &config.github.api_url, repo)?)
            } else {
                None
            };

            let filter = PathFilter::from_config(&config.filter)?;
            let options = PipelineOptions::from_config(&config.history);
            let pr_number = pr_number.unwrap_or_default();

            tracing::debug!(
                branch = %options.branch,
                window_days = options.window_days,
                local_diff = diff_source.is_some(),
                local_blame = local_blame.is_some(),
                "starting churn run"
            );

            let report = match (&diff_source, &local_blame, &github) {
                (Some(prs), Some(blame), _) => {
                    run_score(prs, blame, pr_number, options, filter).await?
                }
                (Some(prs), None, Some(gh)) => {
                    run_score(prs, gh, pr_number, options, filter).await?
                }
                (None, Some(blame), Some(gh)) => {
                    run_score(gh, blame, pr_number, options, filter).await?
                }
                (None, None, Some(gh)) => run_score(gh, gh, pr_number, options, filter).await?,
                (_, _, None) => miette::bail!("GitHub access is required for this run"),
            };

            if !report.skipped.is_empty() {
                tracing::warn!(
                    skipped = report.skipped.len(),
                    "some files were left out of the score"
                );
            }

            let rendered = prchurn_review::report::render(&report, cli.format)?;
            print!("{rendered}");

            if let Some(threshold) = fail_above {
                if report.total > threshold {
                    eprintln!("churn score {} exceeds {threshold}", report.total);
                    std::process::exit(1);
                }
            }
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "prchurn", &mut std::io::stdout());
        }
    }

    Ok(())
}
