pub mod error;
pub mod types;
pub mod config;
pub mod descriptor; // field descriptors (operator wrappers)
pub mod expression; // alias/value tables, condition and update compilers
pub mod soft_delete; // deletedAt overlay
pub mod evaluator; // parser/evaluator for the emitted dialect
pub mod entity; // record identity and normalization
pub mod pagination; // cursor-driven page streams

pub use error::{Error, Result};
pub use types::*;
pub use config::{DynamoConfig, RepositoryConfig, Stage};
pub use descriptor::{Descriptor, Fields};
pub use expression::{AliasTable, Expressions, ValueTable};
pub use entity::{Entity, Identity};
pub use pagination::{Cursor, Page};
