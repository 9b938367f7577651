//! Decision-model data: types, values, variables and projects

pub mod expr;
pub mod meta;
pub mod project;
pub mod types;
pub mod value;
pub mod variable;

pub use expr::{parse_expr, parse_value, Expr};
pub use project::{Import, Project};
pub use types::{CompoundType, EnumType, FieldDecl, PrimitiveType, TypeDecl, TypeRef, TypeRegistry};
pub use value::{RefAction, Value};
pub use variable::{qualify, split_qualified, Variable};
