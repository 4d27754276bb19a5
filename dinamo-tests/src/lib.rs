/// Test utilities and helpers for Dinamo testing
///
/// Everything here runs against [`MemoryStore`], laid out the way the
/// production table is: `source`/`target` primary key plus a `byTarget`
/// index that flips them.

use dinamo_api::{ItemBuilder, KeySchema, MemoryStore, Repository, TableDefinition};
use dinamo_core::{Item, RepositoryConfig};
use tracing_subscriber::EnvFilter;

pub const TABLE: &str = "entities";
pub const BY_TARGET: &str = "byTarget";

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Table layout used by every integration test
pub fn entities_table() -> TableDefinition {
    TableDefinition::new(TABLE, KeySchema::new("source").with_sort_key("target"))
        .with_index(BY_TARGET, KeySchema::new("target").with_sort_key("source"))
}

/// Repository wrapper that owns its in-memory store
pub struct TestRepository {
    pub repo: Repository<MemoryStore>,
}

impl TestRepository {
    /// Repository with default settings (soft delete on, deleted records filtered)
    pub fn new() -> Self {
        Self::with_config(RepositoryConfig::new(TABLE))
    }

    pub fn with_config(config: RepositoryConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }

    /// Store whose pages never hold more than `page_size` evaluated records
    pub fn paged(page_size: usize) -> Self {
        Self::with_store(MemoryStore::new().with_page_size(page_size), RepositoryConfig::new(TABLE))
    }

    fn with_store(store: MemoryStore, config: RepositoryConfig) -> Self {
        init_tracing();
        store.create_table(entities_table());
        let repo = Repository::new(store, config).expect("Failed to create repository");
        Self { repo }
    }

    /// Records physically present, including soft-deleted ones
    pub fn stored(&self) -> usize {
        self.repo.store().item_count(TABLE).expect("Failed to count items")
    }

    /// Create a root record for each id: `<kind>#0`, `<kind>#1`, ...
    pub async fn seed_roots(&self, kind: &str, count: usize) -> anyhow::Result<()> {
        for i in 0..count {
            let item = ItemBuilder::root(format!("{}#{}", kind, i))
                .number("index", i as i64)
                .build();
            self.repo.create(item).await?;
        }
        Ok(())
    }

    /// Create `count` edges from `source` to `<kind>#00`, `<kind>#01`, ...
    pub async fn seed_edges(&self, source: &str, kind: &str, count: usize) -> anyhow::Result<()> {
        for i in 0..count {
            let item = ItemBuilder::entity(source, format!("{}#{:02}", kind, i))
                .number("index", i as i64)
                .build();
            self.repo.create(item).await?;
        }
        Ok(())
    }
}

impl Default for TestRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Primary key of a record
pub fn key(source: &str, target: &str) -> Item {
    ItemBuilder::entity(source, target).build()
}

/// Primary key of a root record
pub fn root_key(source: &str) -> Item {
    key(source, source)
}
