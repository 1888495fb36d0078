// src/sema/mod.rs
pub mod analyzer;
pub mod compatibility;
pub mod decl_table;
pub mod scope;
pub mod types;

pub use analyzer::{Analysis, Analyzer};
pub use compatibility::{compatible, equivalent};
pub use decl_table::{DeclId, DeclTable};
pub use scope::SymbolTable;
pub use types::Ty;
