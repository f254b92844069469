use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use workbox::config::WorkboxConfig;
use workbox::observability::transition_metrics;
use workbox::telemetry::init_telemetry;
use workbox::workflows::{
    BatchOutcome, CommentOutcome, CommentPrompt, CommentRequest, Fixture, InMemoryWorkflowStore,
    ItemRef, SelectedItem, TransitionAction, TransitionEngine, TransitionRequest, UiSignals,
};

#[derive(Parser)]
#[command(name = "workbox")]
#[command(about = "Move content items through their workflow states")]
#[command(long_about = "Workbox validates that a workflow command still applies to each item's \
                       current state, executes the transition, and reports items that moved \
                       underneath you or whose state has no next step defined.")]
struct Cli {
    /// Store fixture to load (defaults to the configured store path)
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    /// Write the resulting item states back to the fixture
    #[arg(long, global = true)]
    write: bool,
    /// Print the batch outcome as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single item through a workflow command
    Send {
        #[arg(long, help = "Workflow id")]
        workflow: String,
        #[arg(long, help = "Command to execute")]
        command: String,
        #[arg(long, help = "Item as id,language,version")]
        item: ItemRef,
        #[arg(long, help = "State you expect the item to be in")]
        state: Option<String>,
        #[arg(long, help = "Comment recorded with the transition")]
        comment: Option<String>,
        #[arg(long, help = "Do not record a comment")]
        no_comment: bool,
    },
    /// Send an explicit selection of items
    SendSelected {
        #[arg(long, help = "Workflow id")]
        workflow: String,
        #[arg(long, help = "State the selection was made in")]
        state: String,
        #[arg(long, help = "Command to execute")]
        command: String,
        #[arg(long = "item", required = true, help = "Item as id,language,version[@state]; repeatable")]
        items: Vec<SelectedItem>,
    },
    /// Send every item currently in a state
    SendAll {
        #[arg(long, help = "Workflow id")]
        workflow: String,
        #[arg(long, help = "State whose items are sent")]
        state: String,
        #[arg(long, help = "Command to execute")]
        command: String,
    },
}

/// Prints signals to the terminal
struct ConsoleSignals {
    quiet: bool,
}

impl UiSignals for ConsoleSignals {
    fn alert(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  {message}");
        }
    }

    fn request_refresh(&self) {
        if !self.quiet {
            println!("🔄 View refresh requested");
        }
    }
}

/// Comment taken from the command line instead of a dialog
struct ArgumentComment(Option<String>);

#[async_trait]
impl CommentPrompt for ArgumentComment {
    async fn collect(&self, _request: &CommentRequest) -> CommentOutcome {
        match &self.0 {
            Some(text) => CommentOutcome::Provided(text.clone()),
            None => CommentOutcome::Skipped,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WorkboxConfig::load_env_file()?;
    let config = WorkboxConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.observability)?;

    tokio::runtime::Runtime::new()?.block_on(run(cli, config))
}

async fn run(cli: Cli, config: WorkboxConfig) -> Result<()> {
    let fixture_path = cli
        .fixture
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.fixture_path));
    let store = Arc::new(InMemoryWorkflowStore::from_fixture(Fixture::load(&fixture_path)?)?);

    let (action, comment) = build_action(cli.command, &config);
    let engine = TransitionEngine::from_store(store.clone(), Arc::new(ConsoleSignals { quiet: cli.json }))
        .with_comment_prompt(Arc::new(ArgumentComment(comment)))
        .with_completion_notifications(config.engine.notify_on_completion);

    let outcome = engine.handle(action).await?;
    engine.notifier().wait_idle().await;

    print_outcome(&outcome, cli.json)?;

    if cli.write {
        store.to_fixture().await.save_to_file(&fixture_path)?;
        if !cli.json {
            println!("💾 Saved item states to {}", fixture_path.display());
        }
    }

    if config.observability.metrics_enabled {
        transition_metrics().log_stats();
    }
    Ok(())
}

fn build_action(command: Commands, config: &WorkboxConfig) -> (TransitionAction, Option<String>) {
    match command {
        Commands::Send {
            workflow,
            command,
            item,
            state,
            comment,
            no_comment,
        } => {
            let suppress_comment = no_comment || (comment.is_none() && config.engine.suppress_comment);
            let action = TransitionAction::Send {
                request: TransitionRequest {
                    target: item,
                    command_id: command,
                    workflow_id: workflow,
                    expected_state_id: state,
                },
                suppress_comment,
            };
            (action, comment)
        }
        Commands::SendSelected {
            workflow,
            state,
            command,
            items,
        } => (
            TransitionAction::SendSelected {
                workflow_id: workflow,
                state_id: state,
                command_id: command,
                items,
            },
            None,
        ),
        Commands::SendAll {
            workflow,
            state,
            command,
        } => (
            TransitionAction::SendAll {
                workflow_id: workflow,
                state_id: state,
                command_id: command,
            },
            None,
        ),
    }
}

fn print_outcome(outcome: &BatchOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let result = &outcome.result;
    println!(
        "✅ Processed {} item(s), {} succeeded",
        result.processed_count, result.succeeded_count
    );
    if result.item_was_moved {
        println!("   Some items had moved to a different state and were skipped");
    }
    if result.missing_next_step {
        println!("   Some items are in a state without a next step for this command");
    }
    Ok(())
}
