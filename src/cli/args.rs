//! CLI argument definitions using clap
//!
//! Every subcommand reads `--config <path>` (default `./corefstore.json`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::ids::{ClusterId, DocumentId, MentionId, WorkspaceId};

/// corefstore - indexed text with coreference annotations
#[derive(Parser, Debug)]
#[command(name = "corefstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./corefstore.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init,

    /// Index a tokenized document from a JSON file of sentences
    Index {
        #[arg(long)]
        document: DocumentId,
        /// `[[{"text":..,"start_offset":..,"end_offset":..}, ..], ..]`
        #[arg(long)]
        input: PathBuf,
    },

    /// Print tokens with global index in [start, end]
    Tokens {
        #[arg(long)]
        document: DocumentId,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
    },

    /// Print every sentence of a document
    Sentences {
        #[arg(long)]
        document: DocumentId,
    },

    /// Remove all tokens of a document
    DeleteDocument {
        #[arg(long)]
        document: DocumentId,
    },

    /// Create an empty cluster in a workspace
    CreateCluster {
        #[arg(long)]
        workspace: WorkspaceId,
    },

    /// Add a mention spanning global tokens [start, end]
    AddMention {
        #[arg(long)]
        cluster: ClusterId,
        #[arg(long)]
        document: DocumentId,
        #[arg(long, allow_negative_numbers = true)]
        start: i64,
        #[arg(long, allow_negative_numbers = true)]
        end: i64,
    },

    /// List the clusters of a workspace
    Clusters {
        #[arg(long)]
        workspace: WorkspaceId,
    },

    /// List the mentions of a cluster
    Mentions {
        #[arg(long)]
        cluster: ClusterId,
    },

    /// Resolve a mention to its tokens
    Resolve {
        #[arg(long)]
        mention: MentionId,
    },

    /// Remove one mention
    DeleteMention {
        #[arg(long)]
        mention: MentionId,
    },

    /// Remove a cluster and all of its mentions
    DeleteCluster {
        #[arg(long)]
        cluster: ClusterId,
    },

    /// Remove every cluster and mention of a workspace
    ClearWorkspace {
        #[arg(long)]
        workspace: WorkspaceId,
    },

    /// Report component health, table sizes and counters
    Health,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_mention_with_negative_start() {
        let cluster = ClusterId::new();
        let document = DocumentId::new();
        let cli = Cli::try_parse_from([
            "corefstore",
            "add-mention",
            "--cluster",
            &cluster.to_string(),
            "--document",
            &document.to_string(),
            "--start",
            "-1",
            "--end",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::AddMention { cluster: c, start, end, .. } => {
                assert_eq!(c, cluster);
                assert_eq!((start, end), (-1, 2));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("./corefstore.json"));
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["corefstore", "health", "--config", "/etc/coref.json"]).unwrap();
        assert!(matches!(cli.command, Command::Health));
        assert_eq!(cli.config, PathBuf::from("/etc/coref.json"));
    }

    #[test]
    fn test_bad_uuid_rejected() {
        let result = Cli::try_parse_from(["corefstore", "sentences", "--document", "not-a-uuid"]);
        assert!(result.is_err());
    }
}
