use modelsync_core::model::meta::mesh_meta_model;
use modelsync_core::model::PrimitiveType;
use modelsync_core::{Import, ModelStore, Project, TypeRef, Value, Variable};

/// Root project, meta model and the pool projects with one service
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
                .with_import(Import::explicit("AllConstants")),
        )
        .unwrap();
    for name in ["Meta", "AllServices", "AllTypes", "AllConstants"] {
        model.add_project(Project::new(name)).unwrap();
    }

    let reader = Value::compound(
        "Service",
        [("id", Value::str("svc-reader")), ("name", Value::str("Reader"))],
    )
    .coerce(&TypeRef::named("Service"), model.types())
    .unwrap();
    model
        .insert_variable(
            Variable::new("reader", "AllServices", TypeRef::named("Service")).with_value(reader),
        )
        .unwrap();

    let int = TypeRef::Primitive(PrimitiveType::Integer);
    model
        .insert_variable(
            Variable::new("timeout", "AllConstants", int.clone()).with_value(Value::Int(30)),
        )
        .unwrap();
    model
        .insert_variable(
            Variable::new("banner", "AllConstants", TypeRef::Primitive(PrimitiveType::String))
                .with_value(Value::str("say \"hi\""))
                .frozen(),
        )
        .unwrap();
    model
        .insert_variable(
            Variable::new(
                "limits",
                "PlatformConfiguration",
                TypeRef::set_of(TypeRef::ref_to(int)),
            )
            .with_value(Value::Container(vec![Value::reference("timeout")])),
        )
        .unwrap();
    model
}

/// Two-node pipeline in the node/edge JSON format
#[allow(dead_code)]
pub fn pipeline_graph() -> &'static str {
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
