pub mod statement;
pub mod types;
pub mod value;

pub use statement::{new_statement_id, Statement, StatementIdentity};
pub use types::{
    Context, Mechanism, Metadata, Modality, Object, ObjectValue, Predicate, ProcedureStep,
    Subject, Temporality,
};
pub use value::Value;
