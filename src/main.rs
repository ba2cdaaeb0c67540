use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing::debug;

use revue_core::{Baseline, CommitType, OutputFormat, RevueConfig, Severity};
use revue_difflens::filter::PathFilter;
use revue_difflens::metrics::{analyze, MetricsReport};
use revue_difflens::source::{GitDiffSource, PatchDiffSource};
use revue_review::llm::LlmClient;
use revue_review::orchestrator::ReviewOrchestrator;
use revue_review::tools::commit_message;

#[derive(Parser)]
#[command(
    name = "revue",
    version,
    about = "AI code review for your working tree",
    long_about = "Revue reviews the uncommitted changes of a git repository.\n\n\
                   It measures the diff (lines, a heuristic complexity score, naive security\n\
                   indicators), then lets an LLM read the changes through tools, suggest a\n\
                   conventional commit message and write the review to a markdown file.\n\n\
                   Examples:\n  \
                     revue metrics                   Measure the working tree against the index\n  \
                     git diff main | revue metrics --stdin\n  \
                     revue review --path .           Review the working tree with AI\n  \
                     revue mcp                       Serve the tools over MCP (stdio)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .revue.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output (debug logs on stderr)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Measure changed lines, complexity and security indicators
    #[command(
        long_about = "Measure changed lines, complexity and security indicators.\n\n\
        Compares the working tree against the index (or --base), skips excluded paths\n\
        and reports per-file and aggregate metrics. With --file or --stdin a unified\n\
        diff is measured instead of the repository.\n\n\
        Examples:\n  revue metrics\n  revue metrics --base main --fail-on high\n  git diff | revue metrics --stdin --format json",
        group(ArgGroup::new("input").args(["file", "stdin"]))
    )]
    Metrics {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Measure a patch file instead of the repository
        #[arg(long)]
        file: Option<PathBuf>,

        /// Measure a diff read from stdin instead of the repository
        #[arg(long)]
        stdin: bool,

        /// Additional path to skip (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Compare against this revision ("index", "head" or any revspec)
        #[arg(long)]
        base: Option<String>,

        /// Exit with code 1 if an issue of this severity or higher is found
        #[arg(
            long,
            long_help = "Exit with non-zero code if security indicators of this severity or higher are found.\n\n\
            Severity ranking: high > medium > low.\nUseful in CI pipelines to fail builds on risky changes."
        )]
        fail_on: Option<Severity>,
    },
    /// Review the working tree with an LLM
    #[command(long_about = "Review the working tree with an LLM.\n\n\
        The model reads the changes through tools, may suggest a conventional commit\n\
        message and writes its review to a markdown file in the repository.\n\
        Requires an API key (REVUE_API_KEY, OPENAI_API_KEY or [llm] api_key).\n\n\
        Examples:\n  revue review\n  revue review --output docs/review.md\n  revue review --no-report --format json")]
    Review {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Report file name, relative to the repository
        #[arg(long)]
        output: Option<String>,

        /// Do not let the model write a markdown report
        #[arg(long)]
        no_report: bool,

        /// Do not let the model suggest a commit message
        #[arg(long)]
        no_commit_message: bool,

        /// Compare against this revision ("index", "head" or any revspec)
        #[arg(long)]
        base: Option<String>,
    },
    /// Format a conventional commit message header
    #[command(long_about = "Format a conventional commit message header.\n\n\
        Prints type(scope): summary, or type: summary without a scope.\n\n\
        Examples:\n  revue commit-message --type fix --scope parser --summary 'handle empty hunks'")]
    CommitMessage {
        /// One of feat, fix, docs, style, refactor, perf, test, chore
        #[arg(long = "type")]
        kind: CommitType,

        /// What the change does
        #[arg(long)]
        summary: String,

        /// Optional scope
        #[arg(long)]
        scope: Option<String>,
    },
    /// Start MCP server for IDE integration
    #[command(long_about = "Start MCP server for IDE integration.\n\n\
        Runs a Model Context Protocol server on stdio, exposing get_file_changes,\n\
        code_metrics, generate_commit_message and write_review_to_markdown.\n\n\
        Examples:\n  revue mcp\n  revue mcp --path /path/to/repo")]
    Mcp {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Create a default .revue.toml configuration file
    #[command(long_about = "Create a default .revue.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .revue.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const CONFIG_FILE: &str = ".revue.toml";

const DEFAULT_CONFIG: &str = r#"# Revue Configuration

[llm]
# Any OpenAI-compatible endpoint works.
# provider = "openai"
# model = "gpt-4o"
# api_key = "..."          # or set REVUE_API_KEY / OPENAI_API_KEY
# base_url = "https://api.openai.com"

[review]
# Paths skipped before any diff is fetched (exact path or directory prefix)
# exclude = ["dist", "bun.lock"]
# Glob patterns skipped as well
# skip_patterns = ["*.min.js", "vendor/**"]
# What the working tree is compared against: "index", "head" or a revision
# baseline = "index"
# report_filename = "code-review.md"
# max_steps = 8
# commit_message = true
# write_report = true
"#;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RevueConfig> {
    match path {
        Some(path) => Ok(RevueConfig::from_file(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(RevueConfig::from_file(default_path)?)
            } else {
                Ok(RevueConfig::default())
            }
        }
    }
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mrevue\x1b[0m v{version}: AI code review for your working tree\n");

        println!("Quick start:");
        println!("  \x1b[36mrevue init\x1b[0m                    Create a .revue.toml config file");
        println!("  \x1b[36mrevue metrics\x1b[0m                 Measure your uncommitted changes");
        println!("  \x1b[36mrevue review\x1b[0m                  Review your uncommitted changes with AI\n");

        println!("All commands:");
        println!("  \x1b[32mmetrics\x1b[0m         Lines, complexity and security indicators");
        println!("  \x1b[32mreview\x1b[0m          AI review with commit message and markdown report");
        println!("  \x1b[32mcommit-message\x1b[0m  Format a conventional commit header");
        println!("  \x1b[32mmcp\x1b[0m             Start MCP server for IDE integration");
        println!("  \x1b[32minit\x1b[0m            Create default configuration\n");
    } else {
        println!("revue v{version}: AI code review for your working tree\n");

        println!("Quick start:");
        println!("  revue init                    Create a .revue.toml config file");
        println!("  revue metrics                 Measure your uncommitted changes");
        println!("  revue review                  Review your uncommitted changes with AI\n");

        println!("All commands:");
        println!("  metrics         Lines, complexity and security indicators");
        println!("  review          AI review with commit message and markdown report");
        println!("  commit-message  Format a conventional commit header");
        println!("  mcp             Start MCP server for IDE integration");
        println!("  init            Create default configuration\n");
    }

    println!("Run 'revue <command> --help' for details.");
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .into_diagnostic()
        .wrap_err("reading stdin")?;
    Ok(input)
}

fn print_metrics(report: &MetricsReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    debug!(format = %cli.format, baseline = %config.review.baseline, "config loaded");

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Metrics {
            ref path,
            ref file,
            stdin,
            ref exclude,
            ref base,
            fail_on,
        }) => {
            if let Some(base) = base {
                config.review.baseline = Baseline::from(base.clone());
            }
            let filter = exclude
                .iter()
                .fold(PathFilter::from_config(&config.review), |f, literal| {
                    f.with_literal(literal.clone())
                });

            let report = if stdin {
                let input = read_stdin()?;
                if input.trim().is_empty() {
                    miette::bail!(miette::miette!(
                        help = "Pipe a diff to revue, e.g.: git diff main | revue metrics --stdin",
                        "Empty diff input"
                    ));
                }
                analyze(&PatchDiffSource::parse(&input)?, &filter)?
            } else if let Some(file) = file {
                let source = PatchDiffSource::from_file(file)
                    .wrap_err(format!("reading {}", file.display()))?;
                analyze(&source, &filter)?
            } else {
                let source = GitDiffSource::open(path, config.review.baseline.clone())?;
                analyze(&source, &filter)?
            };

            print_metrics(&report, cli.format)?;

            if let Some(threshold) = fail_on {
                if report.metrics.has_issues_at(threshold) {
                    std::process::exit(1);
                }
            }
        }
        Some(Command::Review {
            ref path,
            ref output,
            no_report,
            no_commit_message,
            ref base,
        }) => {
            if let Some(base) = base {
                config.review.baseline = Baseline::from(base.clone());
            }
            if let Some(output) = output {
                config.review.report_filename = output.clone();
            }
            if no_report {
                config.review.write_report = false;
            }
            if no_commit_message {
                config.review.commit_message = false;
            }

            if config.llm.resolved_api_key().is_none() {
                miette::bail!(miette::miette!(
                    help = "Set REVUE_API_KEY or OPENAI_API_KEY, or add api_key in your .revue.toml under [llm]",
                    "No API key configured for LLM provider '{}'",
                    config.llm.provider
                ));
            }

            let root = GitDiffSource::open(path, config.review.baseline.clone())?.workdir();
            let client = LlmClient::new(&config.llm)?;
            debug!(model = client.model(), root = %root.display(), "starting review");
            let orchestrator = ReviewOrchestrator::new(client, root, config.review.clone());

            let spinner = if std::io::stderr().is_terminal() {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .into_diagnostic()?,
                );
                pb.set_message("Reviewing changes...");
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let outcome = orchestrator.run().await.inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            })?;

            if let Some(pb) = spinner {
                pb.finish_with_message(format!("Done ({} tool calls)", outcome.tool_calls));
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&outcome).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", outcome.to_markdown()),
                OutputFormat::Text => print!("{outcome}"),
            }
        }
        Some(Command::CommitMessage {
            kind,
            ref summary,
            ref scope,
        }) => {
            if summary.trim().is_empty() {
                miette::bail!("--summary must not be empty");
            }
            let message = commit_message(kind, scope.as_deref(), summary.trim());
            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(
                            &serde_json::json!({ "commitMessage": message })
                        )
                        .into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => println!("`{message}`"),
                OutputFormat::Text => println!("{message}"),
            }
        }
        Some(Command::Mcp { ref path }) => {
            revue_mcp::server::run_server(path.clone(), config.review).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{} already exists", CONFIG_FILE);
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "revue", &mut std::io::stdout());
        }
    }

    Ok(())
}
