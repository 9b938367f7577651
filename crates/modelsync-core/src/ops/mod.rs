pub mod project_ops;
pub mod store;
pub mod variable_ops;

pub use store::ModelStore;
