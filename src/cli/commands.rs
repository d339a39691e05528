//! CLI command implementations
//!
//! Each invocation: load config → replay journal → run one operation →
//! print one JSON object. A data directory must be created with `init`
//! before any other command will open it.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::Config;
use crate::engine::Engine;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::storage::FileJournal;
use crate::text_index::TokenInput;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command)
}

/// Run one command, printing its result or error envelope
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    match execute(config_path, cmd) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command and return its `data` payload
pub fn execute(config_path: &Path, cmd: Command) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );

    if let Command::Init = cmd {
        return init(&config);
    }

    let engine = open_engine(&config)?;
    match cmd {
        Command::Init => init(&config),
        Command::Index { document, input } => {
            let sentences: Vec<Vec<TokenInput>> = read_json_file(&input)?;
            let summary = engine.text_index().index_document(document, &sentences)?;
            Ok(serde_json::to_value(summary)?)
        }
        Command::Tokens {
            document,
            start,
            end,
        } => {
            let tokens = engine.text_index().get_tokens_in_range(document, start, end)?;
            Ok(serde_json::to_value(tokens)?)
        }
        Command::Sentences { document } => {
            let sentences = engine.text_index().get_sentences(document)?;
            Ok(serde_json::to_value(sentences)?)
        }
        Command::DeleteDocument { document } => {
            let removed = engine.text_index().delete_document(document)?;
            Ok(json!({"document_id": document, "tokens_removed": removed}))
        }
        Command::CreateCluster { workspace } => {
            let cluster = engine.annotations().create_cluster(workspace)?;
            Ok(serde_json::to_value(cluster)?)
        }
        Command::AddMention {
            cluster,
            document,
            start,
            end,
        } => {
            let mention = engine
                .annotations()
                .add_mention(cluster, document, start, end)?;
            Ok(serde_json::to_value(mention)?)
        }
        Command::Clusters { workspace } => {
            let store = engine.annotations();
            let mut listed = Vec::new();
            for cluster in store.get_clusters_for_workspace(workspace)? {
                let mention_count = store.mention_count(cluster.id)?;
                let mut entry = serde_json::to_value(&cluster)?;
                entry["mention_count"] = json!(mention_count);
                listed.push(entry);
            }
            Ok(Value::Array(listed))
        }
        Command::Mentions { cluster } => {
            let mentions = engine.annotations().get_mentions_for_cluster(cluster)?;
            Ok(serde_json::to_value(mentions)?)
        }
        Command::Resolve { mention } => {
            let record = engine.annotations().get_mention(mention)?;
            let resolution = engine.annotations().resolve_mention(mention)?;
            Ok(json!({"mention": record, "resolution": resolution}))
        }
        Command::DeleteMention { mention } => {
            let removed = engine.annotations().delete_mention(mention)?;
            Ok(serde_json::to_value(removed)?)
        }
        Command::DeleteCluster { cluster } => {
            let mention_ids = engine.annotations().delete_cluster(cluster)?;
            Ok(json!({"cluster_id": cluster, "mention_ids": mention_ids}))
        }
        Command::ClearWorkspace { workspace } => {
            let cleared = engine.annotations().delete_all_annotations(workspace)?;
            Ok(serde_json::to_value(cleared)?)
        }
        Command::Health => Ok(json!({
            "health": engine.health(),
            "tables": engine.stats()?,
            "metrics": engine.metrics().snapshot(),
        })),
    }
}

/// Create the data directory and an empty journal.
pub fn init(config: &Config) -> CliResult<Value> {
    if is_initialized(config.data_path()) {
        return Err(CliError::already_initialized());
    }

    open_engine_unchecked(config)?;

    Ok(json!({
        "initialized": true,
        "journal": FileJournal::journal_path(config.data_path()),
    }))
}

fn is_initialized(data_dir: &Path) -> bool {
    FileJournal::journal_path(data_dir).exists()
}

fn open_engine(config: &Config) -> CliResult<Engine> {
    if !is_initialized(config.data_path()) {
        return Err(CliError::not_initialized());
    }
    open_engine_unchecked(config)
}

fn open_engine_unchecked(config: &Config) -> CliResult<Engine> {
    Engine::open(config).map_err(|e| CliError::boot_failed(format!("Journal replay failed: {}", e)))
}
