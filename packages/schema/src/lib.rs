//! # Formsmith Schema
//!
//! Field vocabulary shared by the editor, persistence and bindings.
//!
//! - [`Field`]: one field configuration tagged by `type`, as stored per node
//! - [`FieldDef`]: the nested declarative schema a renderer consumes
//! - [`FieldRegistry`]: known types and their defaults
//! - [`IDGenerator`]: fresh node ids

pub mod error;
pub mod field;
pub mod id_generator;
pub mod registry;
pub mod schema;
pub mod visitor;

pub use error::{SchemaError, SchemaResult};
pub use field::{Config, Field, FieldKind, LayoutKind, TabMeta};
pub use id_generator::{new_form_id, new_seed, IDGenerator};
pub use registry::{FieldRegistry, FieldTypeInfo};
pub use schema::{FieldDef, SchemaDocument, TabDef};
pub use visitor::{walk_field, walk_fields, walk_tab, NameCollector, Visitor};
