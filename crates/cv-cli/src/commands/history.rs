//! History command implementation - records and inspects conversation
//! state transitions in a DuckDB database

use anyhow::{Context, Result};
use cv_core::{ActorType, ConversationId, DbType, HistoryEntry, HistoryId, NewTransition};
use cv_history::HistoryStore;
use serde_json::Value;
use std::path::PathBuf;

use crate::cli::{
    AppendArgs, DeleteArgs, GlobalArgs, HistoryArgs, HistoryCommands, ListArgs, OpenArgs,
    OutputFormat,
};
use crate::commands::common::{load_config, verbose, IN_MEMORY_DB};

/// Execute a history subcommand
pub(crate) async fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let path = database_path(args, global)?;
    verbose(global, format!("Opening history database {}", path.display()));
    let store = HistoryStore::open(&path)
        .with_context(|| format!("Failed to open history database {}", path.display()))?;

    match &args.command {
        HistoryCommands::Open(open) => execute_open(&store, open),
        HistoryCommands::Append(append) => execute_append(&store, append, global),
        HistoryCommands::List(list) => execute_list(&store, list),
        HistoryCommands::Delete(delete) => execute_delete(&store, delete),
    }
}

/// `--database`, else the configured DuckDB file for the selected target
fn database_path(args: &HistoryArgs, global: &GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &args.database {
        return Ok(PathBuf::from(path));
    }

    let config = load_config(global)?;
    let database = config.database_for(global.target.as_deref())?;
    if database.db_type != DbType::DuckDb {
        anyhow::bail!(
            "History commands need a DuckDB database, but the configured backend is {}. Pass --database <file>.",
            database.db_type
        );
    }
    if database.path == IN_MEMORY_DB {
        anyhow::bail!(
            "The configured DuckDB database is in-memory. Pass --database <file> to keep history."
        );
    }
    Ok(PathBuf::from(database.path))
}

fn conversation_id(raw: &str) -> Result<ConversationId> {
    Ok(ConversationId::parse(raw)?)
}

fn execute_open(store: &HistoryStore, args: &OpenArgs) -> Result<()> {
    let conv_id = conversation_id(&args.conv_id)?;
    store.create_conversation(&conv_id, &args.status)?;
    println!("Opened conversation {} ({})", conv_id, args.status);
    Ok(())
}

fn execute_append(store: &HistoryStore, args: &AppendArgs, global: &GlobalArgs) -> Result<()> {
    let conv_id = conversation_id(&args.conv_id)?;
    let actor_type: ActorType = args.actor_type.parse()?;

    let mut transition =
        NewTransition::new(conv_id, &args.to_status).actor(actor_type, args.actor_id.clone());
    if let Some(from) = &args.from_status {
        transition = transition.from_status(from);
    }
    if let Some(reason) = &args.reason {
        transition = transition.reason(reason);
    }
    if let Some(id) = &args.id {
        let id = HistoryId::parse(id.as_str())?;
        transition = transition.with_id(id);
    }
    for entry in &args.meta {
        let (key, value) = parse_meta(entry)?;
        transition = transition.meta(key, value);
    }

    let entry = store.append(transition)?;
    verbose(global, format!("Stored history row {}", entry.history_id));

    if args.json {
        let json =
            serde_json::to_string_pretty(&entry).context("Failed to serialize to JSON")?;
        println!("{}", json);
    } else {
        println!(
            "Recorded {}: {} -> {}",
            entry.history_id,
            entry.from_status.as_deref().unwrap_or("-"),
            entry.to_status
        );
    }
    Ok(())
}

/// Split `key=value`; the value is JSON when it parses, a string otherwise.
fn parse_meta(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Invalid --meta '{raw}': expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid --meta '{raw}': key must not be empty");
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn execute_list(store: &HistoryStore, args: &ListArgs) -> Result<()> {
    let conv_id = conversation_id(&args.conv_id)?;
    if !store.conversation_exists(&conv_id)? {
        anyhow::bail!("Conversation '{}' not found", conv_id);
    }
    let entries = store.history_for(&conv_id)?;

    match args.output {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&entries).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_table(entries: &[HistoryEntry]) {
    let id_width = entries
        .iter()
        .map(|e| e.history_id.len())
        .max()
        .unwrap_or(10)
        .max(10);
    let from_width = entries
        .iter()
        .map(|e| e.from_status.as_deref().map_or(1, str::len))
        .max()
        .unwrap_or(4)
        .max(4);
    let to_width = entries
        .iter()
        .map(|e| e.to_status.len())
        .max()
        .unwrap_or(2)
        .max(2);
    let time_width = 23;
    let actor_width = 10;

    println!(
        "{:<id_width$}  {:<time_width$}  {:<from_width$}  {:<to_width$}  {:<actor_width$}  REASON",
        "HISTORY_ID", "CREATED_AT", "FROM", "TO", "ACTOR"
    );
    println!(
        "{:-<id_width$}  {:-<time_width$}  {:-<from_width$}  {:-<to_width$}  {:-<actor_width$}  {}",
        "",
        "",
        "",
        "",
        "",
        "-".repeat(20)
    );

    for entry in entries {
        println!(
            "{:<id_width$}  {:<time_width$}  {:<from_width$}  {:<to_width$}  {:<actor_width$}  {}",
            entry.history_id.as_str(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            entry.from_status.as_deref().unwrap_or("-"),
            entry.to_status,
            entry.actor_type.as_str(),
            entry.reason.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!("{} transition(s)", entries.len());
}

fn execute_delete(store: &HistoryStore, args: &DeleteArgs) -> Result<()> {
    let conv_id = conversation_id(&args.conv_id)?;
    let removed = store.delete_conversation(&conv_id)?;
    println!(
        "Deleted conversation {} and {} history row(s)",
        conv_id, removed
    );
    Ok(())
}
