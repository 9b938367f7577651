//! Import Manager Tests
//!
//! ## Scenarios Covered
//!
//! 1. Unused projects of the root
//! 2. Adding and removing explicit imports
//! 3. Cycles and removals that break references are rejected

mod common;

use common::{args, platform_mapper};
use modelsync_core::{Import, Project};

#[test]
fn test_unused_projects_exclude_referenced_ones() {
    let mapper = platform_mapper();

    // AllConstants is used through `limits -> timeout`
    assert_eq!(
        mapper.get_unused_projects().unwrap(),
        vec!["AllServices", "AllTypes"]
    );
}

#[test]
fn test_graph_application_makes_services_used() {
    let mut mapper = platform_mapper();
    mapper
        .set_graph("", "orders", "intake", "json", common::short_pipeline_graph())
        .unwrap();

    // application -> mesh -> node -> service
    assert_eq!(mapper.get_unused_projects().unwrap(), vec!["AllTypes"]);
}

#[test]
fn test_remove_then_add_import() {
    let mut mapper = platform_mapper();

    let removed = mapper.remove_imports(&args(&["AllTypes"])).unwrap();
    assert_eq!(removed, vec!["AllTypes"]);
    let root = mapper.model().project("PlatformConfiguration").unwrap();
    assert!(!root.has_import(&Import::explicit("AllTypes")));

    let added = mapper.add_imports(&args(&["AllTypes", "AllServices"])).unwrap();
    // AllServices was already imported
    assert_eq!(added, vec!["AllTypes"]);
    // import changes carry no variable records
    assert!(mapper.last_changes().is_empty());
}

#[test]
fn test_removal_breaking_references_rolls_back() {
    let mut mapper = platform_mapper();

    // GIVEN: `limits` references `timeout` through the AllConstants import
    let err = mapper.remove_imports(&args(&["AllConstants"])).unwrap_err();

    // THEN: validation fails and the import stays
    assert_eq!(err.code(), "ERR_VALIDATION_FAILED");
    assert_eq!(err.op(), Some("remove-imports"));
    let root = mapper.model().project("PlatformConfiguration").unwrap();
    assert!(root.has_import(&Import::explicit("AllConstants")));
}

#[test]
fn test_cyclic_import_is_rejected() {
    let mut model = common::platform_model();
    model
        .add_project(Project::new("Shared").with_import(Import::explicit("PlatformConfiguration")))
        .unwrap();
    let mut mapper = modelsync_core::ModelMapper::new(model, modelsync_core::MapperConfig::default());

    let err = mapper.add_imports(&args(&["Shared"])).unwrap_err();

    assert_eq!(err.code(), "ERR_CYCLIC_IMPORT");
    assert!(!mapper
        .model()
        .project("PlatformConfiguration")
        .unwrap()
        .has_import(&Import::explicit("Shared")));
}

#[test]
fn test_unknown_import_fails() {
    let mut mapper = platform_mapper();

    let err = mapper.add_imports(&args(&["Nowhere"])).unwrap_err();
    assert_eq!(err.code(), "ERR_NOT_FOUND");

    let err = mapper.remove_imports(&args(&["Nowhere"])).unwrap_err();
    assert_eq!(err.code(), "ERR_NOT_FOUND");
}
