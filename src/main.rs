use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use flownote::config::AppConfig;
use flownote::error::{ErrorCode, describe};
use flownote::flow::{ChangeSource, Direction, impact, layout, parse, splice_flow};
use flownote::llm::LlmClient;
use flownote::llm::types::LlmError;
use flownote::services::agent::AgentSuggester;
use flownote::services::api::{ApiClient, ApiError};
use flownote::services::storage::{DocumentStorage, HttpStorage, MemoryStorage, StorageError};
use flownote::services::suggest::{HttpSuggester, Suggester};
use flownote::store::{ChatRole, FlowStore, templates};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
    #[error("suggestion failed: {0}")]
    Suggestion(String),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "E_CLI_READ",
            Self::Write { .. } => "E_CLI_WRITE",
            Self::Json(_) => "E_CLI_JSON",
            Self::Llm(e) => e.error_code(),
            Self::Api(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::UnknownTemplate(_) => "E_UNKNOWN_TEMPLATE",
            Self::Suggestion(_) => "E_SUGGESTION_FAILED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            Self::Api(e) => e.retryable(),
            Self::Storage(e) => e.retryable(),
            _ => false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "flownote", about = "Flowchart notes: parse, lay out, diff and edit flow documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the graph parsed from a document.
    Parse(InputArgs),
    /// Print node positions for a document.
    Layout {
        #[command(flatten)]
        input: InputArgs,
        /// Lay out left to right instead of top to bottom.
        #[arg(long, default_value_t = false)]
        lr: bool,
    },
    /// Rewrite the flow region in canonical form.
    Fmt {
        #[command(flatten)]
        input: InputArgs,
        /// Write the result back to the file instead of stdout.
        #[arg(long, default_value_t = false)]
        write: bool,
    },
    /// Print the impact of going from one document to another.
    Diff { old: PathBuf, new: PathBuf },
    /// Ask the agent for a suggested edit.
    Suggest(SuggestArgs),
    /// List built-in templates, or print one.
    Templates { id: Option<String> },
    /// Stored documents on the backend.
    Docs(DocsCommand),
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(default_value = "-", help = "Input file path, or - for stdin")]
    input: String,
}

#[derive(Args, Debug)]
struct SuggestArgs {
    #[arg(help = "Input file path, or - for stdin")]
    input: String,

    message: String,

    /// Send the request to the backend agent instead of calling the LLM directly.
    #[arg(long, default_value_t = false)]
    remote: bool,

    /// Template whose role prompt is passed to the agent.
    #[arg(long)]
    template: Option<String>,

    /// Apply the suggestion and write the result back to the file.
    #[arg(long, default_value_t = false)]
    apply: bool,
}

#[derive(Args, Debug)]
struct DocsCommand {
    #[command(subcommand)]
    command: DocsSubcommand,
}

#[derive(Subcommand, Debug)]
enum DocsSubcommand {
    List,
    Show { id: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Parse(args) => run_parse(&args),
        Command::Layout { input, lr } => run_layout(&input, lr),
        Command::Fmt { input, write } => run_fmt(&input, write),
        Command::Diff { old, new } => run_diff(&old, &new),
        Command::Suggest(args) => run_suggest(args).await,
        Command::Templates { id } => run_templates(id.as_deref()),
        Command::Docs(docs) => run_docs(docs).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

fn run_parse(args: &InputArgs) -> Result<(), CliError> {
    let text = read_input(&args.input)?;
    print_json(&parse(&text))
}

fn run_layout(args: &InputArgs, lr: bool) -> Result<(), CliError> {
    let text = read_input(&args.input)?;
    let direction = if lr { Direction::LeftToRight } else { Direction::TopToBottom };
    print_json(&layout(&parse(&text), direction))
}

fn run_fmt(args: &InputArgs, write: bool) -> Result<(), CliError> {
    let text = read_input(&args.input)?;
    let formatted = splice_flow(&text, &parse(&text));
    if write && args.input != "-" {
        write_output(&args.input, &formatted)
    } else {
        print!("{formatted}");
        Ok(())
    }
}

fn run_diff(old: &Path, new: &Path) -> Result<(), CliError> {
    let old = read_input(&old.to_string_lossy())?;
    let new = read_input(&new.to_string_lossy())?;
    print_json(&impact(&parse(&old), &parse(&new)))
}

async fn run_suggest(args: SuggestArgs) -> Result<(), CliError> {
    let config = AppConfig::from_env();
    let text = read_input(&args.input)?;

    let suggester: Arc<dyn Suggester> = if args.remote {
        Arc::new(HttpSuggester::new(ApiClient::new(&config.api)?))
    } else {
        Arc::new(AgentSuggester::new(Arc::new(LlmClient::from_env()?), config.agent))
    };
    let mut store = FlowStore::new(Arc::new(MemoryStorage::new()), suggester, config.store);

    if let Some(id) = &args.template {
        if !store.apply_template(id) {
            return Err(CliError::UnknownTemplate(id.clone()));
        }
    }
    store.set_text(text, ChangeSource::User);

    if !store.request_suggestion(&args.message).await {
        let reason = store
            .chat()
            .iter()
            .rev()
            .find(|c| c.role == ChatRole::Error)
            .map_or_else(|| "empty message".to_string(), |c| c.text.clone());
        return Err(CliError::Suggestion(reason));
    }
    if let Some(suggestion) = store.pending_suggestion() {
        print_json(suggestion)?;
    }

    if args.apply && args.input != "-" && store.apply_suggestion().is_some() {
        write_output(&args.input, store.text())?;
    }
    Ok(())
}

#[derive(Serialize)]
struct TemplateSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
}

fn run_templates(id: Option<&str>) -> Result<(), CliError> {
    match id {
        Some(id) => {
            let template = templates::template(id).ok_or_else(|| CliError::UnknownTemplate(id.to_string()))?;
            print!("{}", template.text);
            Ok(())
        }
        None => {
            let list: Vec<TemplateSummary<'_>> = templates::templates()
                .iter()
                .map(|t| TemplateSummary { id: t.id, name: t.name, description: t.description })
                .collect();
            print_json(&list)
        }
    }
}

async fn run_docs(docs: DocsCommand) -> Result<(), CliError> {
    let config = AppConfig::from_env();
    let storage = HttpStorage::new(ApiClient::new(&config.api)?);
    match docs.command {
        DocsSubcommand::List => print_json(&storage.list().await?),
        DocsSubcommand::Show { id } => {
            let doc = storage.load(&id).await?;
            print!("{}", doc.text);
            Ok(())
        }
        DocsSubcommand::Delete { id } => {
            storage.delete(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn read_input(path: &str) -> Result<String, CliError> {
    let result = if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(path)
    };
    result.map_err(|source| CliError::Read { path: path.to_string(), source })
}

fn write_output(path: &str, text: &str) -> Result<(), CliError> {
    std::fs::write(path, text).map_err(|source| CliError::Write { path: path.to_string(), source })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
