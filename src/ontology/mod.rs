pub mod loader;
pub mod registry;

pub use registry::{
    Cardinality, ObjectShape, RegistryBuilder, RegistryHandle, RelationSpec, SchemaRegistry,
    SubPart, SubjectTypeSpec, ValueRange,
};
