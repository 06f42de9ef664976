use denorm_model::Document;
use denorm_types::DocumentId;

use crate::error::StorageResult;
use crate::query::{Filter, Patch};

/// The document store the sync core reads from and patches.
///
/// `replace` writes a whole document; `update_one` and `update_many` are
/// partial updates that set only the patched fields. Partial updates do not
/// go through any lifecycle notification.
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document. Fails if the id already exists.
    fn insert(&self, document: &Document) -> StorageResult<()>;

    /// Rewrites an existing document's fields.
    fn replace(&self, document: &Document) -> StorageResult<()>;

    fn find(&self, schema: &str, id: DocumentId) -> StorageResult<Option<Document>>;

    /// All documents of `schema` matching `filter`, in id order.
    fn find_all(&self, schema: &str, filter: &Filter) -> StorageResult<Vec<Document>>;

    fn find_one(&self, schema: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        Ok(self.find_all(schema, filter)?.into_iter().next())
    }

    /// Sets the patched fields on one document. Returns false if it does not exist.
    fn update_one(&self, schema: &str, id: DocumentId, patch: &Patch) -> StorageResult<bool>;

    /// Sets the patched fields on every matching document. Returns how many matched.
    fn update_many(&self, schema: &str, filter: &Filter, patch: &Patch) -> StorageResult<usize>;

    /// Returns false if the document did not exist.
    fn delete(&self, schema: &str, id: DocumentId) -> StorageResult<bool>;
}
