// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SemanticError {
    #[error("'{name}' is already declared in this scope")]
    #[diagnostic(code(E2001))]
    DeclarationConflict {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("undeclared identifier '{name}'")]
    #[diagnostic(code(E2002))]
    UndeclaredIdentifier {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("expected {expected}, but '{name}' is not one")]
    #[diagnostic(code(E2003))]
    WrongKindIdentifier {
        name: String,
        expected: &'static str,
        #[label("wrong kind of name")]
        span: SourceSpan,
    },

    #[error("'{name}' shadows an inherited member")]
    #[diagnostic(code(E2004))]
    InheritedMemberShadowed {
        name: String,
        #[label("already declared by a base class or interface")]
        span: SourceSpan,
    },

    #[error("'{name}' overrides an inherited method with a different signature")]
    #[diagnostic(code(E2005))]
    OverrideSignatureMismatch {
        name: String,
        #[label("signature must match the inherited method")]
        span: SourceSpan,
    },

    #[error("class '{class}' does not implement '{method}' from interface '{interface}'")]
    #[diagnostic(code(E2006))]
    MissingInterfaceMethod {
        class: String,
        interface: String,
        method: String,
        #[label("interface not satisfied")]
        span: SourceSpan,
    },

    #[error("operands of '{op}' have invalid types {left} and {right}")]
    #[diagnostic(code(E2010))]
    InvalidOperands {
        op: &'static str,
        left: String,
        right: String,
        #[label("invalid operand types")]
        span: SourceSpan,
    },

    #[error("operand of '{op}' has invalid type {found}")]
    #[diagnostic(code(E2011))]
    InvalidUnaryOperand {
        op: &'static str,
        found: String,
        #[label("invalid operand type")]
        span: SourceSpan,
    },

    #[error("cannot assign {found} to {expected}")]
    #[diagnostic(code(E2012))]
    IncompatibleAssignment {
        expected: String,
        found: String,
        #[label("incompatible types")]
        span: SourceSpan,
    },

    #[error("test expression must be bool, found {found}")]
    #[diagnostic(code(E2013))]
    TestNotBool {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("break is only allowed inside a loop or switch case")]
    #[diagnostic(code(E2014))]
    BreakOutsideLoop {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("'this' is only valid within class scope")]
    #[diagnostic(code(E2015))]
    ThisOutsideClass {
        #[label("no enclosing class")]
        span: SourceSpan,
    },

    #[error("'{class}' has no field named '{field}'")]
    #[diagnostic(code(E2016))]
    FieldNotFound {
        class: String,
        field: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("field '{field}' of '{class}' is not accessible here")]
    #[diagnostic(
        code(E2017),
        help("variable members are visible only to the declaring class and its subclasses")
    )]
    InaccessibleField {
        class: String,
        field: String,
        #[label("cannot access")]
        span: SourceSpan,
    },

    #[error("'{class}' has no method named '{method}'")]
    #[diagnostic(code(E2018))]
    MethodNotFound {
        class: String,
        method: String,
        #[label("unknown method")]
        span: SourceSpan,
    },

    #[error("member access on non-object type {found}")]
    #[diagnostic(code(E2019))]
    BaseNotObject {
        found: String,
        #[label("not a class or interface type")]
        span: SourceSpan,
    },

    #[error("subscripted value is not an array, found {found}")]
    #[diagnostic(code(E2020))]
    NotAnArray {
        found: String,
        #[label("expected an array")]
        span: SourceSpan,
    },

    #[error("array subscript must be int, found {found}")]
    #[diagnostic(code(E2021))]
    SubscriptNotInt {
        found: String,
        #[label("expected int")]
        span: SourceSpan,
    },

    #[error("array size must be int, found {found}")]
    #[diagnostic(code(E2022))]
    ArraySizeNotInt {
        found: String,
        #[label("expected int")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E2023))]
    WrongArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("argument {index} expects {expected}, found {found}")]
    #[diagnostic(code(E2024))]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        found: String,
        #[label("incompatible argument")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a function")]
    #[diagnostic(code(E2025))]
    NotAFunction {
        name: String,
        #[label("cannot call this")]
        span: SourceSpan,
    },

    #[error("length() takes no arguments")]
    #[diagnostic(code(E2026))]
    LengthTakesNoArguments {
        #[label("remove the arguments")]
        span: SourceSpan,
    },

    #[error("Print cannot handle values of type {found}")]
    #[diagnostic(code(E2027), help("Print accepts int, bool, and string arguments"))]
    UnprintableType {
        found: String,
        #[label("unprintable")]
        span: SourceSpan,
    },

    #[error("cannot return {found} from a function declared to return {expected}")]
    #[diagnostic(code(E2028))]
    ReturnTypeMismatch {
        expected: String,
        found: String,
        #[label("incompatible return value")]
        span: SourceSpan,
    },

    #[error("program must define a zero-parameter 'main' function")]
    #[diagnostic(code(E2030))]
    MissingMain,

    #[error("'main' must not take parameters")]
    #[diagnostic(code(E2031))]
    MainHasParameters {
        #[label("remove these parameters")]
        span: SourceSpan,
    },

    #[error("the double type is not supported")]
    #[diagnostic(
        code(E2032),
        help("double values are accepted by the grammar but cannot be compiled")
    )]
    UnsupportedDouble {
        #[label("double-typed value")]
        span: SourceSpan,
    },
}

impl SemanticError {
    /// Stable diagnostic code, e.g. `E2002`.
    pub fn code_string(&self) -> String {
        self.code().map(|c| c.to_string()).unwrap_or_default()
    }
}
