// src/codegen/mod.rs
pub mod emit;
pub mod layout;
pub mod location;
pub mod mips;
pub mod tac;

pub use emit::CodeGen;
pub use layout::Layout;
pub use location::{Location, Segment};
pub use mips::lower;
pub use tac::{Instr, TacOp};
