//! Meta-model for services, meshes and applications
//!
//! Graph synchronization writes node, connector, mesh and application values
//! with the field names below. A decision model used with the mapper must
//! declare compatible types; [`mesh_meta_model`] provides the canonical set.

use crate::model::types::{CompoundType, EnumType, PrimitiveType, TypeDecl, TypeRef};

pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_VERSION: &str = "ver";
pub const FIELD_POS_X: &str = "pos_x";
pub const FIELD_POS_Y: &str = "pos_y";
pub const FIELD_IMPL: &str = "impl";
pub const FIELD_NEXT: &str = "next";
pub const FIELD_FROM: &str = "from";
pub const FIELD_SOURCES: &str = "sources";
pub const FIELD_NODES: &str = "nodes";
pub const FIELD_CONNECTORS: &str = "connectors";

fn string() -> TypeRef {
    TypeRef::Primitive(PrimitiveType::String)
}

fn integer() -> TypeRef {
    TypeRef::Primitive(PrimitiveType::Integer)
}

fn boolean() -> TypeRef {
    TypeRef::Primitive(PrimitiveType::Boolean)
}

fn refs(target: &str) -> TypeRef {
    TypeRef::set_of(TypeRef::ref_to(TypeRef::named(target)))
}

/// Type declarations for services, meshes and applications, owned by `project`
pub fn mesh_meta_model(project: &str) -> Vec<TypeDecl> {
    vec![
        EnumType::new(
            "ServiceKind",
            project,
            &["SOURCE_SERVICE", "TRANSFORMATION_SERVICE", "SINK_SERVICE", "PROBE_SERVICE"],
        )
        .into(),
        CompoundType::new("DataType", project)
            .field(FIELD_NAME, string())
            .into(),
        CompoundType::new("RecordType", project)
            .refining("DataType")
            .field("fields", TypeRef::sequence_of(string()))
            .into(),
        CompoundType::new("ServiceBase", project)
            .abstract_type()
            .field(FIELD_ID, string())
            .field(FIELD_NAME, string())
            .field(FIELD_DESCRIPTION, string())
            .field(FIELD_VERSION, string())
            .into(),
        CompoundType::new("Service", project)
            .refining("ServiceBase")
            .field("kind", TypeRef::named("ServiceKind"))
            .field("deployable", boolean())
            .field("input", TypeRef::sequence_of(TypeRef::ref_to(TypeRef::named("DataType"))))
            .field("output", TypeRef::sequence_of(TypeRef::ref_to(TypeRef::named("DataType"))))
            .into(),
        CompoundType::new("JavaService", project)
            .refining("Service")
            .field("class", string())
            .field("artifact", string())
            .into(),
        CompoundType::new("Server", project)
            .field(FIELD_ID, string())
            .field("host", string())
            .into(),
        CompoundType::new("MeshElement", project)
            .abstract_type()
            .field(FIELD_NAME, string())
            .into(),
        CompoundType::new("MeshNode", project)
            .refining("MeshElement")
            .abstract_type()
            .field(FIELD_ID, string())
            .field(FIELD_POS_X, integer())
            .field(FIELD_POS_Y, integer())
            .field(FIELD_IMPL, TypeRef::ref_to(TypeRef::named("ServiceBase")))
            .field(FIELD_NEXT, refs("MeshConnector"))
            .into(),
        CompoundType::new("MeshSource", project)
            .refining("MeshNode")
            .into(),
        CompoundType::new("MeshProcessor", project)
            .refining("MeshNode")
            .into(),
        CompoundType::new("MeshSink", project)
            .refining("MeshNode")
            .into(),
        CompoundType::new("MeshConnector", project)
            .refining("MeshElement")
            .field(FIELD_FROM, TypeRef::ref_to(TypeRef::named("MeshNode")))
            .field(FIELD_NEXT, TypeRef::ref_to(TypeRef::named("MeshNode")))
            .into(),
        CompoundType::new("ServiceMesh", project)
            .field(FIELD_DESCRIPTION, string())
            .field(FIELD_SOURCES, refs("MeshSource"))
            .field(FIELD_NODES, refs("MeshNode"))
            .field(FIELD_CONNECTORS, refs("MeshConnector"))
            .into(),
        CompoundType::new("Application", project)
            .field(FIELD_ID, string())
            .field(FIELD_NAME, string())
            .field(FIELD_DESCRIPTION, string())
            .field(FIELD_VERSION, string())
            .field(
                "services",
                TypeRef::sequence_of(TypeRef::ref_to(TypeRef::named("ServiceMesh"))),
            )
            .into(),
    ]
}
