mod common;

use common::*;
use denorm_model::{Document, RelationDescriptor};
use denorm_storage::DocumentStore;
use denorm_sync::{Directive, EngineConfig, SyncEngine, SyncError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn parent(h: &Harness, name: &str) -> Document {
    h.create(Document::new("Parent").with("name", name).with("age", 40))
}

fn child_of(h: &Harness, parent: &Document) -> Document {
    h.create(Document::new("Child").with("parent_id", parent.id))
}

// ── Pull ─────────────────────────────────────────────────────────

#[test]
fn create_pulls_fields() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let child = child_of(&h, &parent);

    assert_eq!(child.get_str("parent_name"), Some("parent"));
    assert_eq!(h.reload(&child).get_str("parent_name"), Some("parent"));
}

#[test]
fn changing_reference_pulls_from_new_source() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let mut child = child_of(&h, &parent);
    let new_parent = self::parent(&h, "new_parent");

    child.assign(&RelationDescriptor::belongs_to("parent"), Some(&new_parent));
    h.repo.save(&mut child).unwrap();

    assert_eq!(h.reload(&child).get_str("parent_name"), Some("new_parent"));
}

#[test]
fn update_attributes_with_new_reference() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let mut child = child_of(&h, &parent);
    let new_parent = self::parent(&h, "new_parent");

    h.repo
        .update_attributes(&mut child, attrs(json!({ "parent_id": new_parent.id })))
        .unwrap();

    assert_eq!(h.reload(&child).get_str("parent_name"), Some("new_parent"));
}

#[test]
fn cleared_reference_keeps_mirrored_fields() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let mut child = child_of(&h, &parent);
    child.assign(&RelationDescriptor::belongs_to("parent"), None);
    h.repo.save(&mut child).unwrap();

    let reloaded = h.reload(&child);
    assert_eq!(reloaded.get("parent_id"), Some(&Value::Null));
    assert_eq!(reloaded.get_str("parent_name"), Some("parent"));
}

#[test]
fn saving_without_reference_change_does_not_pull() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let mut child = child_of(&h, &parent);
    child.set("parent_name", "edited");
    child.set("nickname", "kid");
    h.repo.save(&mut child).unwrap();

    assert_eq!(h.reload(&child).get_str("parent_name"), Some("edited"));
}

#[test]
fn dangling_reference_is_left_alone() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let ghost = Document::new("Parent").with("name", "never saved");
    let child = h.create(Document::new("Child").with("parent_id", ghost.id));

    assert_eq!(child.get("parent_name"), None);
}

#[test]
fn pull_at_before_validate() {
    let (_, engine) = declare(
        Directive::new(["name"])
            .from("parent")
            .child_callback(denorm_types::LifecycleEvent::BeforeValidate),
    );
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let child = child_of(&h, &parent);
    assert_eq!(child.get_str("parent_name"), Some("parent"));
}

// ── Cascade ──────────────────────────────────────────────────────

#[test]
fn parent_update_cascades_to_children() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let first = child_of(&h, &parent);
    let second = child_of(&h, &parent);

    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(h.reload(&first).get_str("parent_name"), Some("new_name"));
    assert_eq!(h.reload(&second).get_str("parent_name"), Some("new_name"));
}

#[test]
fn cascade_only_reaches_own_dependents() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let other = self::parent(&h, "other");
    let mine = child_of(&h, &parent);
    let theirs = child_of(&h, &other);

    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(h.reload(&mine).get_str("parent_name"), Some("new_name"));
    assert_eq!(h.reload(&theirs).get_str("parent_name"), Some("other"));
}

#[test]
fn cascade_patches_only_changed_fields() {
    let (_, engine) = declare(Directive::new(["name", "age"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let child = h.create(
        Document::new("Child")
            .with("parent_id", parent.id)
            .with("nickname", "kid"),
    );
    h.store.reset();

    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(
        h.store.patches(),
        vec![
            ("Parent".to_string(), attrs(json!({ "name": "new_name" }))),
            ("Child".to_string(), attrs(json!({ "parent_name": "new_name" }))),
        ]
    );

    let reloaded = h.reload(&child);
    assert_eq!(reloaded.get_str("nickname"), Some("kid"));
    assert_eq!(reloaded.get("parent_age"), Some(&json!(40)));
}

#[test]
fn noop_update_writes_no_dependents() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    child_of(&h, &parent);
    h.store.reset();

    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "parent" })))
        .unwrap();
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "age": 41 })))
        .unwrap();

    assert!(h.store.patches_to("Child").is_empty());
}

#[test]
fn parent_without_children_updates_cleanly() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(h.reload(&parent).get_str("name"), Some("new_name"));
}

#[test]
fn stale_dependent_save_keeps_cascaded_value() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "old");
    let mut stale = child_of(&h, &parent);
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new" })))
        .unwrap();
    assert_eq!(stale.get_str("parent_name"), Some("old"));

    h.repo
        .update_attributes(&mut stale, attrs(json!({ "nickname": "kid" })))
        .unwrap();

    let reloaded = h.reload(&stale);
    assert_eq!(reloaded.get_str("nickname"), Some("kid"));
    assert_eq!(reloaded.get_str("parent_name"), Some("new"));
}

// ── Store failures ───────────────────────────────────────────────

#[test]
fn failed_dependent_write_surfaces_after_source_commit() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let child = child_of(&h, &parent);
    h.store.fail_writes_to("Child");

    let err = h
        .repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap_err();

    assert!(matches!(
        sync_error(&err),
        SyncError::CollaboratorWriteFailure(_)
    ));
    assert!(!sync_error(&err).is_configuration_error());
    assert_eq!(h.reload(&parent).get_str("name"), Some("new_name"));
    assert_eq!(h.reload(&child).get_str("parent_name"), Some("parent"));
}

#[test]
fn failed_source_read_aborts_the_pull() {
    let (_, engine) = declare(Directive::new(["name"]).from("parent"));
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    h.store.fail_reads_of("Parent");

    let mut child = Document::new("Child").with("parent_id", parent.id);
    let err = h.repo.create(&mut child).unwrap_err();

    assert!(matches!(
        sync_error(&err),
        SyncError::CollaboratorReadFailure(_)
    ));
    assert!(err.to_string().contains("read of Parent unavailable"));
    assert!(child.is_new());
    assert!(h.store.find("Child", child.id).unwrap().is_none());
}

// ── Naming options ───────────────────────────────────────────────

#[test]
fn prefix_names_the_mirrored_field() {
    let (catalog, engine) = declare(Directive::new(["name"]).from("parent").prefix("new_prefix"));
    let h = make_harness(engine);

    let mut parent = parent(&h, "name");
    let child = child_of(&h, &parent);
    assert_eq!(h.reload(&child).get_str("new_prefix_name"), Some("name"));

    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_fancy_name" })))
        .unwrap();
    let reloaded = h.reload(&child);
    assert_eq!(reloaded.get_str("new_prefix_name"), Some("new_fancy_name"));
    assert_eq!(reloaded.get("parent_name"), None);
    assert!(!catalog.get("Child").unwrap().has_field("parent_name"));
}

#[test]
fn as_overrides_prefix() {
    let (catalog, engine) = declare(
        Directive::new(["name"])
            .from("parent")
            .prefix("new_prefix")
            .as_name("supername"),
    );
    let h = make_harness(engine);

    let mut parent = parent(&h, "name");
    let mut child = child_of(&h, &parent);
    assert_eq!(h.reload(&child).get_str("supername"), Some("name"));

    let new_parent = self::parent(&h, "new_name");
    child.assign(&RelationDescriptor::belongs_to("parent"), Some(&new_parent));
    h.repo.save(&mut child).unwrap();
    assert_eq!(h.reload(&child).get_str("supername"), Some("new_name"));

    let dependents_of_old = child_of(&h, &parent);
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_fancy_name" })))
        .unwrap();
    assert_eq!(h.reload(&dependents_of_old).get_str("supername"), Some("new_fancy_name"));

    let schema = catalog.get("Child").unwrap();
    assert!(!schema.has_field("new_prefix_name"));
    assert!(!schema.has_field("parent_name"));
}

// ── Relation shapes ──────────────────────────────────────────────

#[test]
fn class_name_differs_from_reference() {
    let mut catalog = make_catalog([
        parent_schema(),
        child_with(RelationDescriptor::belongs_to("top").with_class_name("Parent")),
    ]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine
        .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("top"))
        .unwrap();
    let h = make_harness(engine);

    let parent = parent(&h, "parent");
    let child = h.create(Document::new("Child").with("top_id", parent.id));
    assert_eq!(child.get_str("top_name"), Some("parent"));
}

#[test]
fn missing_inverse_fails_at_cascade() {
    let mut catalog = make_catalog([
        parent_with(RelationDescriptor::has_many("items", "Child")),
        child_schema(),
    ]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine
        .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("parent"))
        .unwrap();
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let child = child_of(&h, &parent);
    assert_eq!(child.get_str("parent_name"), Some("parent"));

    let err = h
        .repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap_err();
    let err = sync_error(&err);
    assert!(matches!(err, SyncError::UnresolvedInverseRelation { .. }));
    assert!(!err.is_configuration_error());
    assert_eq!(
        err.to_string(),
        "option `inverse_of` is needed for 'belongs_to :parent' into Child"
    );
}

#[test]
fn declared_inverse_reaches_children() {
    let mut catalog = make_catalog([
        parent_with(RelationDescriptor::has_many("items", "Child")),
        child_with(RelationDescriptor::belongs_to("parent").with_inverse_of("items")),
    ]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine
        .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("parent"))
        .unwrap();
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    let child = child_of(&h, &parent);
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(h.reload(&child).get_str("parent_name"), Some("new_name"));
}

fn has_one_harness() -> Harness {
    let mut catalog = make_catalog([
        parent_with(RelationDescriptor::has_one("child", "Child")),
        child_with(RelationDescriptor::belongs_to("parent").with_inverse_of("child")),
    ]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine
        .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("parent"))
        .unwrap();
    make_harness(engine)
}

#[test]
fn has_one_updates_the_child() {
    let h = has_one_harness();

    let mut parent = parent(&h, "parent");
    let child = child_of(&h, &parent);
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert_eq!(h.reload(&child).get_str("parent_name"), Some("new_name"));
}

#[test]
fn has_one_without_child_is_noop() {
    let h = has_one_harness();

    let mut parent = parent(&h, "parent");
    h.store.reset();
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap();

    assert!(h.store.patches_to("Child").is_empty());
}

#[test]
fn many_to_many_inverse_is_unsupported() {
    let mut catalog = make_catalog([
        parent_with(RelationDescriptor::has_and_belongs_to_many("children", "Child")),
        child_schema(),
    ]);
    let mut engine = SyncEngine::new(EngineConfig::default());
    engine
        .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("parent"))
        .unwrap();
    let h = make_harness(engine);

    let mut parent = parent(&h, "parent");
    child_of(&h, &parent);
    let err = h
        .repo
        .update_attributes(&mut parent, attrs(json!({ "name": "new_name" })))
        .unwrap_err();

    assert!(matches!(
        sync_error(&err),
        SyncError::UnsupportedRelationCardinality { relation, .. } if relation == "children"
    ));
}

// ── Polymorphic sources ──────────────────────────────────────────

fn polymorphic_harness(directives: Vec<Directive>) -> Harness {
    let mut schemas = polymorphic_parents();
    schemas.push(polymorphic_child());
    let mut catalog = make_catalog(schemas);
    let mut engine = SyncEngine::new(EngineConfig::default());
    for directive in directives {
        engine.denormalize(&mut catalog, "Child", directive).unwrap();
    }
    make_harness(engine)
}

fn top_child(h: &Harness, top: &Document) -> Document {
    let mut child = Document::new("Child");
    child.assign(&RelationDescriptor::polymorphic("top"), Some(top));
    h.create(child)
}

#[test]
fn shared_field_from_two_source_types() {
    let h = polymorphic_harness(vec![
        Directive::new(["name1"])
            .from("top")
            .inverses_of(["parent1"])
            .as_name("top_name"),
        Directive::new(["name2"])
            .from("top")
            .inverses_of(["parent2"])
            .as_name("top_name"),
    ]);

    let mut parent1 = h.create(Document::new("Parent1").with("name1", "parent"));
    let parent2 = h.create(Document::new("Parent2").with("name2", "other"));
    let first = top_child(&h, &parent1);
    let second = top_child(&h, &parent2);

    assert_eq!(h.reload(&first).get_str("top_name"), Some("parent"));
    assert_eq!(h.reload(&second).get_str("top_name"), Some("other"));
    assert_eq!(h.reload(&first).get("top_name1"), None);

    h.repo
        .update_attributes(&mut parent1, attrs(json!({ "name1": "new_fancy_name" })))
        .unwrap();
    assert_eq!(h.reload(&first).get_str("top_name"), Some("new_fancy_name"));
    assert_eq!(h.reload(&second).get_str("top_name"), Some("other"));
}

#[test]
fn heterogeneous_sources_fill_their_own_fields() {
    let h = polymorphic_harness(vec![Directive::new(["name2", "name1"])
        .from("top")
        .inverses_of(["parent1", "parent2"])]);

    let parent = h.create(Document::new("Parent1").with("name1", "parent"));
    let mut child = top_child(&h, &parent);
    let reloaded = h.reload(&child);
    assert_eq!(reloaded.get_str("top_name1"), Some("parent"));
    assert_eq!(reloaded.get("top_name2"), None);

    let other = h.create(Document::new("Parent2").with("name2", "other"));
    child.assign(&RelationDescriptor::polymorphic("top"), Some(&other));
    h.repo.save(&mut child).unwrap();

    let reloaded = h.reload(&child);
    assert_eq!(reloaded.get_str("top_name2"), Some("other"));
    assert_eq!(reloaded.get_str("top_name1"), Some("parent"));
}

#[test]
fn polymorphic_cascade_matches_source_type() {
    let h = polymorphic_harness(vec![Directive::new(["name1"])
        .from("top")
        .inverses_of(["parent1"])]);

    let mut parent = h.create(Document::new("Parent1").with("name1", "parent"));
    let child = top_child(&h, &parent);

    // Same id under another type must not be patched.
    let impostor = h.create(
        Document::new("Child")
            .with("top_id", parent.id)
            .with("top_type", "Parent2")
            .with("top_name1", "untouched"),
    );

    parent = h.reload(&parent);
    h.repo
        .update_attributes(&mut parent, attrs(json!({ "name1": "new_fancy_name" })))
        .unwrap();

    assert_eq!(h.reload(&child).get_str("top_name1"), Some("new_fancy_name"));
    assert_eq!(h.reload(&impostor).get_str("top_name1"), Some("untouched"));
}
