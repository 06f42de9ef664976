#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use denorm_model::{
    Document, FieldDescriptor, RelationDescriptor, SchemaBuilder, SchemaCatalog, SchemaDescriptor,
};
use denorm_storage::{
    DocumentStore, Filter, Patch, Repository, SqliteDocumentStore, StorageError, StorageResult,
};
use denorm_sync::{Directive, EngineConfig, SyncEngine, SyncError};
use denorm_types::DocumentId;
use serde_json::{Map, Value};

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ── Schemas ──────────────────────────────────────────────────────

/// `Parent { name, age }` with `has_many :children`.
pub fn parent_schema() -> SchemaDescriptor {
    parent_with(RelationDescriptor::has_many("children", "Child"))
}

/// `Parent { name, age }` with the given relation to its dependents.
pub fn parent_with(relation: RelationDescriptor) -> SchemaDescriptor {
    SchemaBuilder::new("Parent")
        .field(FieldDescriptor::text("name"))
        .field(FieldDescriptor::number("age"))
        .relation(relation)
        .build()
        .unwrap()
}

/// `Child { nickname }` with `belongs_to :parent`.
pub fn child_schema() -> SchemaDescriptor {
    child_with(RelationDescriptor::belongs_to("parent"))
}

pub fn child_with(reference: RelationDescriptor) -> SchemaDescriptor {
    SchemaBuilder::new("Child")
        .field(FieldDescriptor::text("nickname"))
        .relation(reference)
        .build()
        .unwrap()
}

/// `Parent1 { name1 }` and `Parent2 { name2 }`, each `has_one :children`.
pub fn polymorphic_parents() -> Vec<SchemaDescriptor> {
    ["1", "2"]
        .into_iter()
        .map(|n| {
            SchemaBuilder::new(&format!("Parent{n}"))
                .field(FieldDescriptor::text(&format!("name{n}")))
                .relation(RelationDescriptor::has_one("children", "Child").with_inverse_of("top"))
                .build()
                .unwrap()
        })
        .collect()
}

/// `Child` with a polymorphic `belongs_to :top`.
pub fn polymorphic_child() -> SchemaDescriptor {
    child_with(RelationDescriptor::polymorphic("top"))
}

pub fn make_catalog(schemas: impl IntoIterator<Item = SchemaDescriptor>) -> SchemaCatalog {
    let mut catalog = SchemaCatalog::new();
    for schema in schemas {
        catalog.register(schema).unwrap();
    }
    catalog
}

/// Catalog with `Parent` and `Child`, and an engine with one directive.
pub fn declare(directive: Directive) -> (SchemaCatalog, SyncEngine) {
    let mut catalog = make_catalog([parent_schema(), child_schema()]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine.denormalize(&mut catalog, "Child", directive).unwrap();
    (catalog, engine)
}

pub fn attrs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// The engine error behind a failed save.
pub fn sync_error(err: &StorageError) -> &SyncError {
    err.hook_error::<SyncError>()
        .unwrap_or_else(|| panic!("not a sync error: {err}"))
}

// ── Store harness ────────────────────────────────────────────────

/// Wraps a store, records the partial updates that go through it and can
/// be told to fail reads or writes of one schema.
pub struct RecordingStore {
    inner: SqliteDocumentStore,
    patches: Mutex<Vec<(String, Patch)>>,
    failing_reads: Mutex<Option<String>>,
    failing_writes: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteDocumentStore::open_in_memory().unwrap(),
            patches: Mutex::new(Vec::new()),
            failing_reads: Mutex::new(None),
            failing_writes: Mutex::new(None),
        }
    }

    /// Partial updates applied, as `(schema, patch)`.
    pub fn patches(&self) -> Vec<(String, Patch)> {
        self.patches.lock().unwrap().clone()
    }

    /// Partial updates applied to documents of `schema`.
    pub fn patches_to(&self, schema: &str) -> Vec<Patch> {
        self.patches()
            .into_iter()
            .filter(|(s, _)| s == schema)
            .map(|(_, patch)| patch)
            .collect()
    }

    pub fn reset(&self) {
        self.patches.lock().unwrap().clear();
    }

    /// Makes every later read of `schema` fail.
    pub fn fail_reads_of(&self, schema: &str) {
        *self.failing_reads.lock().unwrap() = Some(schema.to_string());
    }

    /// Makes every later partial update of `schema` fail.
    pub fn fail_writes_to(&self, schema: &str) {
        *self.failing_writes.lock().unwrap() = Some(schema.to_string());
    }

    fn check(switch: &Mutex<Option<String>>, schema: &str, what: &str) -> StorageResult<()> {
        match switch.lock().unwrap().as_deref() {
            Some(failing) if failing == schema => Err(StorageError::InvalidData(format!(
                "{what} of {schema} unavailable"
            ))),
            _ => Ok(()),
        }
    }
}

impl DocumentStore for RecordingStore {
    fn insert(&self, document: &Document) -> StorageResult<()> {
        self.inner.insert(document)
    }

    fn replace(&self, document: &Document) -> StorageResult<()> {
        Self::check(&self.failing_writes, &document.schema, "write")?;
        self.inner.replace(document)
    }

    fn find(&self, schema: &str, id: DocumentId) -> StorageResult<Option<Document>> {
        Self::check(&self.failing_reads, schema, "read")?;
        self.inner.find(schema, id)
    }

    fn find_all(&self, schema: &str, filter: &Filter) -> StorageResult<Vec<Document>> {
        Self::check(&self.failing_reads, schema, "read")?;
        self.inner.find_all(schema, filter)
    }

    fn update_one(&self, schema: &str, id: DocumentId, patch: &Patch) -> StorageResult<bool> {
        Self::check(&self.failing_writes, schema, "write")?;
        self.patches.lock().unwrap().push((schema.to_string(), patch.clone()));
        self.inner.update_one(schema, id, patch)
    }

    fn update_many(&self, schema: &str, filter: &Filter, patch: &Patch) -> StorageResult<usize> {
        Self::check(&self.failing_writes, schema, "write")?;
        self.patches.lock().unwrap().push((schema.to_string(), patch.clone()));
        self.inner.update_many(schema, filter, patch)
    }

    fn delete(&self, schema: &str, id: DocumentId) -> StorageResult<bool> {
        self.inner.delete(schema, id)
    }
}

/// A repository driving `engine` over a recording in-memory store.
pub struct Harness {
    pub repo: Repository,
    pub store: Arc<RecordingStore>,
}

pub fn make_harness(engine: SyncEngine) -> Harness {
    init_tracing();
    let store = Arc::new(RecordingStore::new());
    let repo = Repository::new(store.clone()).with_observer(Arc::new(engine));
    Harness { repo, store }
}

impl Harness {
    pub fn create(&self, mut document: Document) -> Document {
        self.repo.create(&mut document).unwrap();
        document
    }

    pub fn reload(&self, document: &Document) -> Document {
        self.repo.reload(document).unwrap()
    }
}
