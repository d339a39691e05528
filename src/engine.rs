//! Engine: one database shared by the text index and the annotation store
//!
//! Open sequence:
//! 1. Replay the journal under `data_dir` (any corruption aborts)
//! 2. Build the dispatcher and both services over the same database
//! 3. Register health checks
//!
//! No serving without a complete replay.

use std::sync::Arc;

use crate::annotation::AnnotationStore;
use crate::config::Config;
use crate::errors::CoreResult;
use crate::events::Dispatcher;
use crate::observability::{
    log_event_with_fields, Event, HealthCoordinator, HealthReport, MetricsRegistry,
};
use crate::storage::{Database, TableStats};
use crate::text_index::TextIndex;

/// Token limit used when no configuration is given
pub const DEFAULT_MAX_DOCUMENT_TOKENS: usize = 1_000_000;

pub struct Engine {
    db: Arc<Database>,
    dispatcher: Arc<Dispatcher>,
    text_index: Arc<TextIndex>,
    annotations: Arc<AnnotationStore>,
    health: HealthCoordinator,
}

impl Engine {
    /// Open the engine described by `config`, replaying its journal.
    pub fn open(config: &Config) -> CoreResult<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let db = Database::open(config.data_path(), config.sync_mode(), metrics)?;
        let replayed = db.replay_stats().records_replayed;

        let engine = Self::with_database(Arc::new(db), config.max_document_tokens());
        log_event_with_fields(
            Event::EngineOpened,
            &[
                ("data_dir", &config.data_path().display().to_string()),
                ("records_replayed", &replayed.to_string()),
            ],
        );
        Ok(engine)
    }

    /// An engine whose state is lost when dropped
    pub fn in_memory() -> Self {
        let db = Database::in_memory(Arc::new(MetricsRegistry::new()));
        Self::with_database(Arc::new(db), DEFAULT_MAX_DOCUMENT_TOKENS)
    }

    pub fn with_database(db: Arc<Database>, max_document_tokens: usize) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let text_index = Arc::new(TextIndex::new(
            Arc::clone(&db),
            dispatcher.clone(),
            max_document_tokens,
        ));
        let annotations = Arc::new(AnnotationStore::new(Arc::clone(&db), dispatcher.clone()));

        let mut health = HealthCoordinator::new();
        health.register(db.clone());
        health.register(text_index.clone());
        health.register(annotations.clone());
        health.register(dispatcher.clone());

        Self {
            db,
            dispatcher,
            text_index,
            annotations,
            health,
        }
    }

    pub fn text_index(&self) -> &TextIndex {
        &self.text_index
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.db.metrics()
    }

    pub fn health(&self) -> HealthReport {
        self.health.report()
    }

    pub fn stats(&self) -> CoreResult<TableStats> {
        Ok(self.db.read(|tables| tables.stats())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{DocumentId, WorkspaceId};
    use crate::text_index::TokenInput;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_engine_is_healthy() {
        let engine = Engine::in_memory();
        let report = engine.health();
        assert!(report.healthy);

        let names: Vec<_> = report.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["storage", "text_index", "annotation_store", "dispatcher"]);
    }

    #[test]
    fn test_services_share_one_database() {
        let engine = Engine::in_memory();
        let doc = DocumentId::new();
        engine
            .text_index()
            .index_document(doc, &[vec![TokenInput::new("Hello", 0, 5)]])
            .unwrap();

        let cluster = engine.annotations().create_cluster(WorkspaceId::new()).unwrap();
        engine.annotations().add_mention(cluster.id, doc, 0, 0).unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!((stats.documents, stats.tokens, stats.clusters, stats.mentions), (1, 1, 1, 1));
        assert_eq!(engine.metrics().snapshot().transactions_committed, 3);
    }

    #[test]
    fn test_open_and_reopen() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path());
        let workspace = WorkspaceId::new();

        {
            let engine = Engine::open(&config).unwrap();
            engine.annotations().create_cluster(workspace).unwrap();
        }

        let engine = Engine::open(&config).unwrap();
        assert_eq!(
            engine.annotations().get_clusters_for_workspace(workspace).unwrap().len(),
            1
        );
    }
}
