//! Source field → dependent field naming.

use std::sync::Arc;

use denorm_model::SchemaDescriptor;

use crate::directive::{Directive, FieldMapping};
use crate::error::{SyncError, SyncResult};

/// Turns a directive's field list and naming options into field mappings.
///
/// Naming precedence: `as` names verbatim, else `<prefix>_<field>`, else
/// `<from>_<field>`. Pure; the same directive always yields the same list.
pub fn resolve_field_mappings(directive: &Directive) -> SyncResult<Vec<FieldMapping>> {
    let from = directive
        .from
        .as_deref()
        .filter(|from| !from.is_empty())
        .ok_or(SyncError::MissingSourceOption)?;

    if directive.fields.is_empty() {
        return Err(SyncError::EmptyFieldList);
    }

    if let Some(names) = &directive.as_names {
        let names = names.as_slice();
        if names.len() != directive.fields.len() {
            return Err(SyncError::ArityMismatch {
                fields: directive.fields.len(),
                names: names.len(),
            });
        }
        return Ok(directive
            .fields
            .iter()
            .zip(names)
            .map(|(field, name)| FieldMapping::new(field, name))
            .collect());
    }

    let prefix = directive.prefix.as_deref().unwrap_or(from);
    Ok(directive
        .fields
        .iter()
        .map(|field| FieldMapping::new(field, &format!("{prefix}_{field}")))
        .collect())
}

/// Checks every source field is declared on at least one candidate source.
pub fn check_source_fields(
    mappings: &[FieldMapping],
    sources: &[Arc<SchemaDescriptor>],
) -> SyncResult<()> {
    for mapping in mappings {
        if !sources.iter().any(|s| s.has_field(&mapping.source_field)) {
            let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
            return Err(SyncError::UnknownSourceField {
                field: mapping.source_field.clone(),
                sources: names.join(", "),
            });
        }
    }
    Ok(())
}

/// The subset of `mappings` whose source field `schema` declares.
pub fn mappings_for_source(mappings: &[FieldMapping], schema: &SchemaDescriptor) -> Vec<FieldMapping> {
    mappings
        .iter()
        .filter(|m| schema.has_field(&m.source_field))
        .cloned()
        .collect()
}
