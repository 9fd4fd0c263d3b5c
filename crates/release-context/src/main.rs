//! Inspect and release tool outputs in stored agent sessions.
//!
//! Sessions are read from `{sessions-dir}/{session}.json`.
//!
//! # Examples
//!
//! ```sh
//! # List stored sessions, then the tool calls in one of them
//! release-context list
//! release-context list --session ses_abc
//!
//! # Release the three most recent completed calls
//! release-context release --session ses_abc
//!
//! # Release the last five `read` results
//! release-context release --session ses_abc --tool read --count 5
//!
//! # Release specific calls, printing the structured result
//! release-context release --session ses_abc --call-id call_1 --call-id call_2 --json
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use release_context::{
    ContextReleaser, FileStore, ReleaseConfig, ReleaseRequest, ToolCallSummary,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect and release tool outputs in stored agent sessions.
#[derive(Parser)]
#[command(name = "release-context", version)]
struct Cli {
    /// Directory holding one JSON file per session.
    #[arg(
        long,
        global = true,
        env = "RELEASE_CONTEXT_SESSIONS_DIR",
        default_value = ".sessions"
    )]
    sessions_dir: PathBuf,

    /// More log output (-v debug, -vv trace). Overridden by RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace tool outputs with placeholders.
    Release {
        /// Session to operate on.
        #[arg(long)]
        session: String,

        /// Tool call to release (repeatable). Without this, the most
        /// recent completed calls are released.
        #[arg(long = "call-id")]
        call_ids: Vec<String>,

        /// How many recent calls to release when no --call-id is given.
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,

        /// Only auto-release calls from this tool (repeatable).
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Never auto-release calls from this tool (repeatable).
        #[arg(long = "protect")]
        protected: Vec<String>,

        /// Skip outputs smaller than this many bytes when auto-selecting.
        #[arg(long, default_value_t = 0)]
        min_bytes: usize,

        /// Bytes per token for savings estimates.
        #[arg(long, default_value_t = release_context::tokens::DEFAULT_BYTES_PER_TOKEN)]
        bytes_per_token: f64,

        /// Print the structured result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List tool calls and whether they have been released. Without
    /// --session, list the stored sessions instead.
    List {
        /// Session to inspect.
        #[arg(long)]
        session: Option<String>,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let store = match FileStore::new(&cli.sessions_dir) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!(
                "Error: cannot open sessions directory {}: {e}",
                cli.sessions_dir.display()
            );
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Release {
            session,
            call_ids,
            count,
            tools,
            protected,
            min_bytes,
            bytes_per_token,
            json,
        } => {
            let config = protected
                .into_iter()
                .fold(ReleaseConfig::new(), ReleaseConfig::protect_tool)
                .with_min_output_bytes(min_bytes)
                .with_bytes_per_token(bytes_per_token);
            let releaser = ContextReleaser::new(store).with_config(config);
            let request = ReleaseRequest {
                tool_call_ids: (!call_ids.is_empty()).then_some(call_ids),
                count,
                tools: (!tools.is_empty()).then_some(tools),
            };
            run_release(&releaser, &session, &request, json).await
        }
        Command::List {
            session: Some(session),
            json,
        } => {
            let releaser = ContextReleaser::new(store);
            run_list(&releaser, &session, json).await
        }
        Command::List {
            session: None,
            json,
        } => run_list_sessions(&store, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("release_context={default_level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_release(
    releaser: &ContextReleaser,
    session: &str,
    request: &ReleaseRequest,
    json: bool,
) -> Result<(), String> {
    let outcome = releaser
        .release(session, request)
        .await
        .map_err(|e| e.to_string())?;
    if json {
        let text = serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("{}\n\n{}", outcome.title, outcome.output);
    }
    Ok(())
}

async fn run_list(releaser: &ContextReleaser, session: &str, json: bool) -> Result<(), String> {
    let calls = releaser
        .list_tool_calls(session)
        .await
        .map_err(|e| e.to_string())?;
    if json {
        let text = serde_json::to_string_pretty(&calls).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }
    if calls.is_empty() {
        println!("No tool calls in session {session}.");
        return Ok(());
    }
    for call in &calls {
        println!("{}", format_call(call));
    }
    Ok(())
}

async fn run_list_sessions(store: &FileStore, json: bool) -> Result<(), String> {
    let sessions = store.list_sessions().await.map_err(|e| e.to_string())?;
    if json {
        let text = serde_json::to_string_pretty(&sessions).map_err(|e| e.to_string())?;
        println!("{text}");
    } else if sessions.is_empty() {
        println!("No sessions in {}.", store.dir().display());
    } else {
        for id in &sessions {
            println!("{id}");
        }
    }
    Ok(())
}

fn format_call(call: &ToolCallSummary) -> String {
    let state = if call.released {
        "released".to_string()
    } else {
        call.status.to_string()
    };
    format!(
        "#{:<3} {:<24} {:<8} {:<9} {:>8} B  {}",
        call.message_index, call.call_id, call.tool, state, call.output_bytes, call.title
    )
}
