//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use mriynyk_core::directory::TopicDirectory;
use mriynyk_core::{AnswerResult, Pipeline, ProgressReporter, SilentProgress};
use mriynyk_shared::{
    AppConfig, Discipline, Grade, MriynykError, ResolveStrategy, Topic, TopicRequest, init_config,
    load_config, resolve_api_key, resolve_database_path,
};
use mriynyk_storage::Storage;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Mriynyk: curriculum-grounded explanations and quizzes for students.
#[derive(Parser)]
#[command(
    name = "mriynyk",
    version,
    about = "Answer student questions with workbooks grounded in the school curriculum.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Grade, discipline and corpus location shared by the query commands.
#[derive(Args, Clone)]
pub(crate) struct Scope {
    /// School grade: 8 or 9.
    #[arg(short, long)]
    pub grade: Grade,

    /// Discipline: algebra, ukrainian-language, ukrainian-history (or the Ukrainian label).
    #[arg(short, long)]
    pub discipline: Discipline,

    /// Corpus database path (overrides config and environment).
    #[arg(long)]
    pub db: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a workbook for a topic query.
    Answer {
        /// Free-text topic query.
        query: String,

        #[command(flatten)]
        scope: Scope,

        /// Optional free-text context about the student.
        #[arg(long)]
        student_info: Option<String>,

        /// Topic resolution strategy (overrides config).
        #[arg(long)]
        strategy: Option<ResolveStrategy>,

        /// Print the response as JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },

    /// Answer a JSON topic request read from a file (or `-` for stdin).
    Request {
        /// Path to the request JSON.
        path: String,

        /// Corpus database path (overrides config and environment).
        #[arg(long)]
        db: Option<String>,

        /// Topic resolution strategy (overrides config).
        #[arg(long)]
        strategy: Option<ResolveStrategy>,
    },

    /// List the topics available for a grade and discipline.
    Topics {
        #[command(flatten)]
        scope: Scope,
    },

    /// Answer a multiple-choice question; prints the chosen index.
    Solve {
        /// Question text.
        question: String,

        /// Answer choice (repeat for each option, in order).
        #[arg(short, long = "choice", required = true)]
        choices: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mriynyk=info",
        1 => "mriynyk=debug",
        _ => "mriynyk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Answer {
            query,
            scope,
            student_info,
            strategy,
            json,
        } => cmd_answer(&query, &scope, student_info.as_deref(), strategy, json).await,
        Command::Request { path, db, strategy } => {
            cmd_request(&path, db.as_deref(), strategy).await
        }
        Command::Topics { scope } => cmd_topics(&scope).await,
        Command::Solve {
            question,
            choices,
            scope,
        } => cmd_solve(&question, &choices, &scope).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Attach the stable error kind so scripts can tell failures apart.
fn classify(err: MriynykError) -> color_eyre::Report {
    eyre!("[{}] {err}", err.kind().as_str())
}

async fn open_corpus(config: &AppConfig, db: Option<&str>) -> Result<Arc<Storage>> {
    let path = resolve_database_path(config, db)?;
    let storage = Storage::open_readonly(&path)
        .await
        .wrap_err_with(|| format!("opening corpus at {}", path.display()))?;
    Ok(Arc::new(storage))
}

async fn build_pipeline(
    db: Option<&str>,
    strategy: Option<ResolveStrategy>,
) -> Result<Pipeline> {
    let mut config = load_config()?;
    if let Some(strategy) = strategy {
        config.pipeline.strategy = strategy;
    }
    let api_key = resolve_api_key(&config)?;
    let storage = open_corpus(&config, db).await?;
    Ok(Pipeline::from_config(&config, storage, api_key)?)
}

async fn cmd_answer(
    query: &str,
    scope: &Scope,
    student_info: Option<&str>,
    strategy: Option<ResolveStrategy>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(scope.db.as_deref(), strategy).await?;

    info!(
        grade = %scope.grade,
        discipline = %scope.discipline,
        strategy = pipeline.strategy(),
        "answering topic query"
    );

    let reporter = CliProgress::new();
    let result = pipeline
        .answer_topic(query, scope.grade, scope.discipline, student_info, &reporter)
        .await;
    reporter.clear();
    let result = result.map_err(classify)?;

    if json {
        let response = mriynyk_shared::TopicResponse::from(result.workbook);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", result.workbook.markdown_text);
    println!();
    for (number, question) in result.workbook.quiz_questions.iter().enumerate() {
        println!("{}. {}", number + 1, question.question);
        for (index, option) in question.options.iter().enumerate() {
            let marker = if index as u32 == question.correct_option_index {
                "*"
            } else {
                " "
            };
            println!("   {marker} {index}) {option}");
        }
    }
    println!();
    println!("  Topic:  {}", result.topic);
    println!("  Pages:  {}", result.page_count);
    println!("  Time:   {:.1}s", result.elapsed.as_secs_f64());

    Ok(())
}

async fn cmd_request(
    path: &str,
    db: Option<&str>,
    strategy: Option<ResolveStrategy>,
) -> Result<()> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("reading request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).wrap_err_with(|| format!("reading {path}"))?
    };
    let request: TopicRequest =
        serde_json::from_str(&raw).wrap_err("parsing topic request")?;

    let pipeline = build_pipeline(db, strategy).await?;
    let response = pipeline
        .answer_request(&request, &SilentProgress)
        .await
        .map_err(classify)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_topics(scope: &Scope) -> Result<()> {
    let config = load_config()?;
    let storage = open_corpus(&config, scope.db.as_deref()).await?;
    let topics = list_topics(storage, scope, config.pipeline.stage_timeout()).await?;

    for (index, topic) in topics.iter().enumerate() {
        println!("{index:>3}  {topic}");
    }
    Ok(())
}

/// Same candidate listing the pipeline uses, so an empty scope is `not_found`.
async fn list_topics(storage: Arc<Storage>, scope: &Scope, limit: Duration) -> Result<Vec<Topic>> {
    TopicDirectory::new(storage, limit)
        .candidate_topics(scope.grade, scope.discipline)
        .await
        .map_err(classify)
}

async fn cmd_solve(question: &str, choices: &[String], scope: &Scope) -> Result<()> {
    let pipeline = build_pipeline(scope.db.as_deref(), None).await?;
    let index = pipeline
        .question_solver()
        .solve(question, choices, scope.grade, scope.discipline)
        .await
        .map_err(classify)?;

    println!("{index}) {}", choices[index]);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &AnswerResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn answer_parses_scope_and_strategy() {
        let cli = Cli::try_parse_from([
            "mriynyk",
            "answer",
            "лінійні рівняння",
            "--grade",
            "8",
            "--discipline",
            "algebra",
            "--strategy",
            "enumerate-then-disambiguate",
        ])
        .unwrap();

        match cli.command {
            Command::Answer {
                query,
                scope,
                strategy,
                json,
                ..
            } => {
                assert_eq!(query, "лінійні рівняння");
                assert_eq!(scope.grade, Grade::Eighth);
                assert_eq!(scope.discipline, Discipline::Algebra);
                assert_eq!(strategy, Some(ResolveStrategy::EnumerateThenDisambiguate));
                assert!(!json);
            }
            _ => panic!("expected answer command"),
        }
    }

    #[test]
    fn solve_collects_choices_in_order() {
        let cli = Cli::try_parse_from([
            "mriynyk",
            "solve",
            "Коли виникла Січ?",
            "-c",
            "XV",
            "-c",
            "XVI",
            "--grade",
            "9",
            "--discipline",
            "ukrainian_history",
        ])
        .unwrap();

        match cli.command {
            Command::Solve { choices, scope, .. } => {
                assert_eq!(choices, vec!["XV", "XVI"]);
                assert_eq!(scope.discipline, Discipline::UkrainianHistory);
            }
            _ => panic!("expected solve command"),
        }
    }

    async fn corpus_with(dir: &tempfile::TempDir, grade: u8, topics: &[&str]) -> Arc<Storage> {
        let path = dir.path().join("corpus.db");
        let rw = Storage::open(&path, 3).await.unwrap();
        for &topic in topics {
            rw.insert_page(&mriynyk_storage::NewCorpusRow {
                grade,
                discipline: Discipline::Algebra.label(),
                topic_title: topic,
                page_text: "text",
                page_metadata: None,
                embedding: None,
            })
            .await
            .unwrap();
        }
        drop(rw);
        Arc::new(Storage::open_readonly(&path).await.unwrap())
    }

    fn algebra_scope(grade: Grade) -> Scope {
        Scope {
            grade,
            discipline: Discipline::Algebra,
            db: None,
        }
    }

    #[tokio::test]
    async fn topics_for_empty_scope_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = corpus_with(&dir, 9, &["Функції"]).await;

        let err = list_topics(storage, &algebra_scope(Grade::Eighth), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("[not_found]"), "{err}");
    }

    #[tokio::test]
    async fn topics_are_listed_in_store_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = corpus_with(&dir, 8, &["Дроби", "Рівняння", "Дроби"]).await;

        let topics = list_topics(storage, &algebra_scope(Grade::Eighth), Duration::from_secs(5))
            .await
            .unwrap();
        let labels: Vec<_> = topics.iter().map(Topic::as_str).collect();
        assert_eq!(labels, vec!["Дроби", "Рівняння"]);
    }

    #[test]
    fn unsupported_grade_is_rejected() {
        let result = Cli::try_parse_from([
            "mriynyk",
            "topics",
            "--grade",
            "11",
            "--discipline",
            "algebra",
        ]);
        assert!(result.is_err());
    }
}
