use modelsync_core::model::meta::mesh_meta_model;
use modelsync_core::model::PrimitiveType;
use modelsync_core::{Import, MapperConfig, ModelMapper, ModelStore, Project, TypeRef, Value, Variable};

/// Meta model, root project and the default pool projects
///
/// - `AllServices::reader` and `AllServices::writer` are `Service`s
/// - `AllConstants::timeout` is an integer, `AllConstants::region` a frozen string
/// - `PlatformConfiguration::limits` references `timeout` from a set
#[allow(dead_code)]
pub fn platform_model() -> ModelStore {
    let mut model = ModelStore::new();
    for decl in mesh_meta_model("Meta") {
        model.types_mut().register(decl).unwrap();
    }
    model
        .add_project(
            Project::new("PlatformConfiguration")
                .with_import(Import::explicit("AllServices"))
                .with_import(Import::explicit("AllTypes"))
                .with_import(Import::explicit("AllConstants")),
        )
        .unwrap();
    for name in ["Meta", "AllServices", "AllTypes", "AllConstants"] {
        model.add_project(Project::new(name)).unwrap();
    }

    for (var, id, name) in [("reader", "svc-reader", "Reader"), ("writer", "svc-writer", "Writer")] {
        let value = Value::compound("Service", [("id", Value::str(id)), ("name", Value::str(name))])
            .coerce(&TypeRef::named("Service"), model.types())
            .unwrap();
        model
            .insert_variable(Variable::new(var, "AllServices", TypeRef::named("Service")).with_value(value))
            .unwrap();
    }

    let int = TypeRef::Primitive(PrimitiveType::Integer);
    model
        .insert_variable(Variable::new("timeout", "AllConstants", int.clone()).with_value(Value::Int(30)))
        .unwrap();
    model
        .insert_variable(
            Variable::new("region", "AllConstants", TypeRef::Primitive(PrimitiveType::String))
                .with_value(Value::str("eu"))
                .frozen(),
        )
        .unwrap();
    model
        .insert_variable(
            Variable::new("limits", "PlatformConfiguration", TypeRef::set_of(TypeRef::ref_to(int)))
                .with_value(Value::Container(vec![Value::reference("timeout")])),
        )
        .unwrap();
    model
}

/// Mapper over [`platform_model`] with the default configuration
#[allow(dead_code)]
pub fn platform_mapper() -> ModelMapper {
    ModelMapper::new(platform_model(), MapperConfig::default())
}

/// Three-node pipeline `In -> Filter -> Out` in the node/edge JSON format
#[allow(dead_code)]
pub fn pipeline_graph() -> &'static str {
    r#"{
        "nodes": {
            "a": {"name": "In", "x": 10, "y": 20, "impl": "reader"},
            "b": {"name": "Filter", "x": 110, "y": 20},
            "c": {"name": "Out", "x": 210, "y": 20, "impl": "svc-writer"}
        },
        "edges": [
            {"id": "e1", "source": "a", "target": "b", "name": "raw"},
            {"id": "e2", "source": "b", "target": "c", "name": "clean"}
        ]
    }"#
}

/// [`pipeline_graph`] without the `Out` node
#[allow(dead_code)]
pub fn short_pipeline_graph() -> &'static str {
    r#"{
        "nodes": {
            "a": {"name": "In", "x": 10, "y": 20, "impl": "reader"},
            "b": {"name": "Filter", "x": 110, "y": 20}
        },
        "edges": [
            {"id": "e1", "source": "a", "target": "b", "name": "raw"}
        ]
    }"#
}

#[allow(dead_code)]
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
