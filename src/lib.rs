// src/lib.rs
//! Semantic analyzer and MIPS code generator for Decaf, a small statically
//! typed, class-based object-oriented language. The lexer and parser are
//! external: callers hand `Compiler` a [`frontend::ast::Program`] (built
//! through [`frontend::AstBuilder`], which stamps the node ids the analysis
//! side tables are keyed by) plus the interner its names live in.

pub mod codegen;
pub mod errors;
pub mod frontend;
pub mod sema;

use crate::errors::SemanticError;
use crate::frontend::ast::Program;
use crate::frontend::Interner;
use crate::sema::{Analysis, Analyzer};

pub struct Compiler;

impl Compiler {
    /// Run semantic analysis alone; the result is inspectable by tools and
    /// tests. All collected diagnostics are returned on failure.
    pub fn check(program: &Program, interner: &Interner) -> Result<Analysis, Vec<SemanticError>> {
        Analyzer::new(interner).analyze(program)
    }

    /// Full pipeline: analyze, plan layout, emit TAC, lower to assembly.
    /// Nothing is emitted when analysis reports any diagnostic.
    pub fn compile(program: &Program, interner: &Interner) -> Result<String, Vec<SemanticError>> {
        let analysis = Self::check(program, interner)?;
        let layout = codegen::layout::plan(program, &analysis, interner);
        let code = codegen::CodeGen::emit_program(program, &analysis, &layout, interner);
        Ok(codegen::lower(&code))
    }
}
