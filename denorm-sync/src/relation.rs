//! Resolution of the dependent's reference, its candidate sources, and the
//! inverse relation used to reach dependents from a source.

use std::sync::Arc;

use denorm_model::{
    underscore, Cardinality, ModelError, ModelName, RelationDescriptor, RelationKind,
    SchemaCatalog, SchemaDescriptor,
};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// The relation on a source schema that addresses its dependents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InverseRelation {
    /// Source schema the relation is declared on.
    pub source_schema: String,
    pub name: String,
    pub kind: RelationKind,
}

impl InverseRelation {
    /// `One` or `Many`; anything else cannot be cascaded into.
    pub fn cardinality(&self) -> SyncResult<Cardinality> {
        match self.kind {
            RelationKind::HasOne => Ok(Cardinality::One),
            RelationKind::HasMany => Ok(Cardinality::Many),
            kind => Err(SyncError::UnsupportedRelationCardinality {
                source_schema: self.source_schema.clone(),
                relation: self.name.clone(),
                kind,
            }),
        }
    }
}

/// Finds the reference named `from` on the dependent schema.
pub fn resolve_reference<'a>(
    dependent: &'a SchemaDescriptor,
    from: &str,
) -> SyncResult<&'a RelationDescriptor> {
    let relation = dependent
        .relation(from)
        .ok_or_else(|| SyncError::UnknownRelation {
            schema: dependent.name.clone(),
            relation: from.to_string(),
        })?;
    if !relation.is_reference() {
        return Err(SyncError::NotAReference {
            schema: dependent.name.clone(),
            relation: from.to_string(),
        });
    }
    Ok(relation)
}

/// Resolves the schemas a reference may point to.
///
/// A plain reference resolves to its declared target. A polymorphic one
/// cannot enumerate its targets, so `inverses_of` must list them; entries
/// match a schema name or its singular model name (`parent1` → `Parent1`).
pub fn resolve_sources(
    catalog: &SchemaCatalog,
    dependent: &SchemaDescriptor,
    reference: &RelationDescriptor,
    inverses_of: Option<&[String]>,
) -> SyncResult<Vec<Arc<SchemaDescriptor>>> {
    if let Some(target) = reference.target_schema() {
        if inverses_of.is_some() {
            debug!(
                "Ignoring inverses_of on non-polymorphic `{}` of {}",
                reference.name, dependent.name
            );
        }
        return Ok(vec![catalog.require(target)?]);
    }

    let candidates = inverses_of
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SyncError::MissingPolymorphicSources {
            schema: dependent.name.clone(),
            relation: reference.name.clone(),
        })?;

    let mut sources: Vec<Arc<SchemaDescriptor>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let schema = find_candidate(catalog, candidate)
            .ok_or_else(|| ModelError::UnknownSchema(candidate.clone()))?;
        if !sources.iter().any(|s| s.name == schema.name) {
            sources.push(schema);
        }
    }
    Ok(sources)
}

fn find_candidate(catalog: &SchemaCatalog, candidate: &str) -> Option<Arc<SchemaDescriptor>> {
    if let Some(schema) = catalog.get(candidate) {
        return Some(schema);
    }
    let mut names: Vec<&str> = catalog.names().collect();
    names.sort_unstable();
    names
        .into_iter()
        .filter_map(|name| catalog.get(name))
        .find(|s| s.model_name.singular == candidate || underscore(&s.name) == candidate)
}

/// Chooses the relation on `source` that reaches the dependents, trying in
/// order: the reference's declared inverse, the dependent's plural model
/// name, the dependent's singular model name.
pub fn resolve_inverse(
    source: &SchemaDescriptor,
    dependent_schema: &str,
    dependent_model: &ModelName,
    reference: &RelationDescriptor,
) -> SyncResult<InverseRelation> {
    let relation = reference
        .inverse_of
        .as_deref()
        .and_then(|name| source.relation(name))
        .or_else(|| source.relation(&dependent_model.plural))
        .or_else(|| source.relation(&dependent_model.singular))
        .ok_or_else(|| SyncError::UnresolvedInverseRelation {
            relation: reference.name.clone(),
            dependent: dependent_schema.to_string(),
        })?;

    debug!(
        "Resolved inverse of {}.{} on {}: `{}` ({:?})",
        dependent_schema, reference.name, source.name, relation.name, relation.kind
    );
    Ok(InverseRelation {
        source_schema: source.name.clone(),
        name: relation.name.clone(),
        kind: relation.kind,
    })
}
