// src/sema/analyzer.rs

mod bind;
mod inherit;
mod typecheck;

use crate::errors::SemanticError;
use crate::frontend::ast::{Decl, NodeId, Program};
use crate::frontend::Interner;
use crate::sema::decl_table::{DeclId, DeclTable};
use crate::sema::scope::SymbolTable;
use crate::sema::types::Ty;
use rustc_hash::FxHashMap;

/// The published result of semantic analysis: the declaration arena plus
/// the side tables the layout planner and code generator read.
#[derive(Debug)]
pub struct Analysis {
    pub decls: DeclTable,
    /// Resolved declaration link per identifier use (and declaration) site
    pub decl_of: FxHashMap<NodeId, DeclId>,
    /// Semantic type per expression / type-expression node. Absent entries
    /// are sinks: the node could not be typed and already carries an error.
    pub ty_of: FxHashMap<NodeId, Ty>,
}

impl Analysis {
    pub fn ty(&self, node: NodeId) -> Option<&Ty> {
        self.ty_of.get(&node)
    }

    pub fn decl(&self, node: NodeId) -> Option<DeclId> {
        self.decl_of.get(&node).copied()
    }
}

/// Three-pass semantic analyzer.
///
/// Pass order is fixed: symbol construction, declaration binding,
/// inheritance checking, typing. Each checking pass re-traverses the AST
/// with the scope cursor rewound (`SymbolTable::reset`), so every pass
/// sees the same scope shape pass 1 built.
pub struct Analyzer<'a> {
    pub(crate) interner: &'a Interner,
    pub(crate) symbols: SymbolTable,
    pub(crate) decls: DeclTable,
    pub(crate) decl_of: FxHashMap<NodeId, DeclId>,
    pub(crate) ty_of: FxHashMap<NodeId, Ty>,
    pub(crate) errors: Vec<SemanticError>,
    /// Function whose body is being typed (pass 3 return checking)
    pub(crate) current_function: Option<DeclId>,
    /// Nesting depth of break targets (loop bodies and switch cases)
    pub(crate) break_depth: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            symbols: SymbolTable::new(),
            decls: DeclTable::new(),
            decl_of: FxHashMap::default(),
            ty_of: FxHashMap::default(),
            errors: Vec::new(),
            current_function: None,
            break_depth: 0,
        }
    }

    pub fn analyze(mut self, program: &Program) -> Result<Analysis, Vec<SemanticError>> {
        self.build_symbols(program);

        self.symbols.reset();
        self.bind_program(program);

        self.symbols.reset();
        self.inherit_program(program);

        self.symbols.reset();
        self.typecheck_program(program);

        self.check_main(program);

        if self.errors.is_empty() {
            Ok(Analysis {
                decls: self.decls,
                decl_of: self.decl_of,
                ty_of: self.ty_of,
            })
        } else {
            Err(self.errors)
        }
    }

    pub(crate) fn add_error(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    pub(crate) fn name(&self, sym: crate::frontend::Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    pub(crate) fn ty_name(&self, ty: &Ty) -> String {
        ty.display(self.interner)
    }

    /// The program must define a zero-parameter global `main`; the
    /// parameter count is checked at its declaration, presence here.
    fn check_main(&mut self, program: &Program) {
        let has_main = program.decls.iter().any(|d| {
            matches!(d, Decl::Func(f) if self.interner.resolve(f.name.sym) == "main")
        });
        if !has_main {
            self.add_error(SemanticError::MissingMain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::*;
    use crate::frontend::AstBuilder;

    fn analyze(b: &AstBuilder, decls: Vec<Decl>) -> Result<Analysis, Vec<SemanticError>> {
        Analyzer::new(&b.interner).analyze(&Program { decls })
    }

    fn empty_main(b: &mut AstBuilder) -> Decl {
        let void = b.ty(TypeExprKind::Void);
        let body = b.block(vec![], vec![]);
        Decl::Func(b.func("main", void, vec![], Some(body)))
    }

    fn main_with(b: &mut AstBuilder, decls: Vec<VarDecl>, stmts: Vec<Stmt>) -> Decl {
        let void = b.ty(TypeExprKind::Void);
        let body = b.block(decls, stmts);
        Decl::Func(b.func("main", void, vec![], Some(body)))
    }

    #[test]
    fn empty_program_needs_main() {
        let b = AstBuilder::new();
        let errors = analyze(&b, vec![]).unwrap_err();
        assert!(matches!(errors[0], SemanticError::MissingMain));
    }

    #[test]
    fn minimal_program_passes() {
        let mut b = AstBuilder::new();
        let main = empty_main(&mut b);
        assert!(analyze(&b, vec![main]).is_ok());
    }

    #[test]
    fn main_with_parameters_is_rejected() {
        let mut b = AstBuilder::new();
        let int = b.ty(TypeExprKind::Int);
        let p = b.var_decl("x", int);
        let void = b.ty(TypeExprKind::Void);
        let body = b.block(vec![], vec![]);
        let main = Decl::Func(b.func("main", void, vec![p], Some(body)));
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::MainHasParameters { .. })));
    }

    #[test]
    fn duplicate_declaration_in_block() {
        let mut b = AstBuilder::new();
        let t1 = b.ty(TypeExprKind::Int);
        let v1 = b.var_decl("x", t1);
        let t2 = b.ty(TypeExprKind::Bool);
        let v2 = b.var_decl("x", t2);
        let main = main_with(&mut b, vec![v1, v2], vec![]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::DeclarationConflict { .. }
        ));
    }

    #[test]
    fn shadowing_in_inner_block_is_allowed() {
        let mut b = AstBuilder::new();
        let t1 = b.ty(TypeExprKind::Int);
        let v1 = b.var_decl("x", t1);
        let t2 = b.ty(TypeExprKind::Bool);
        let v2 = b.var_decl("x", t2);
        let inner = b.block(vec![v2], vec![]);
        let main = main_with(&mut b, vec![v1], vec![Stmt::Block(inner)]);
        assert!(analyze(&b, vec![main]).is_ok());
    }

    #[test]
    fn undeclared_identifier_reported() {
        let mut b = AstBuilder::new();
        let x = b.var_ref("nope");
        let one = b.int(1);
        let assign = b.assign(x, one);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(assign)]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::UndeclaredIdentifier { .. }
        ));
    }

    #[test]
    fn arithmetic_wants_matching_numerics() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let yes = b.expr(ExprKind::BoolLit(true));
        let sum = b.binary(BinOp::Add, one, yes);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(sum)]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(errors[0], SemanticError::InvalidOperands { .. }));
    }

    #[test]
    fn error_operands_sink_without_cascading() {
        // (nope + 1) * 2 reports only the unresolved identifier
        let mut b = AstBuilder::new();
        let x = b.var_ref("nope");
        let one = b.int(1);
        let sum = b.binary(BinOp::Add, x, one);
        let two = b.int(2);
        let product = b.binary(BinOp::Mul, sum, two);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(product)]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            SemanticError::UndeclaredIdentifier { .. }
        ));
    }

    #[test]
    fn break_outside_loop_reported() {
        let mut b = AstBuilder::new();
        let brk = Stmt::Break(BreakStmt {
            id: b.node_id(),
            span: b.span,
        });
        let main = main_with(&mut b, vec![], vec![brk]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(errors[0], SemanticError::BreakOutsideLoop { .. }));
    }

    #[test]
    fn break_inside_while_is_fine() {
        let mut b = AstBuilder::new();
        let test = b.expr(ExprKind::BoolLit(true));
        let brk = Stmt::Break(BreakStmt {
            id: b.node_id(),
            span: b.span,
        });
        let body = b.block(vec![], vec![brk]);
        let w = Stmt::While(WhileStmt {
            id: b.node_id(),
            test,
            body: Box::new(Stmt::Block(body)),
            span: b.span,
        });
        let main = main_with(&mut b, vec![], vec![w]);
        assert!(analyze(&b, vec![main]).is_ok());
    }

    #[test]
    fn this_outside_class_reported() {
        let mut b = AstBuilder::new();
        let this = b.expr(ExprKind::This);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(this)]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(errors[0], SemanticError::ThisOutsideClass { .. }));
    }

    #[test]
    fn return_type_must_be_compatible() {
        // int f() { return "s"; }
        let mut b = AstBuilder::new();
        let s = b.string("s");
        let ret = b.ret(s);
        let int = b.ty(TypeExprKind::Int);
        let body = b.block(vec![], vec![ret]);
        let f = Decl::Func(b.func("f", int, vec![], Some(body)));
        let main = empty_main(&mut b);
        let errors = analyze(&b, vec![f, main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::ReturnTypeMismatch { .. }
        ));
    }

    #[test]
    fn call_arity_checked() {
        let mut b = AstBuilder::new();
        let int = b.ty(TypeExprKind::Int);
        let p = b.var_decl("x", int);
        let void = b.ty(TypeExprKind::Void);
        let fbody = b.block(vec![], vec![]);
        let f = Decl::Func(b.func("f", void, vec![p], Some(fbody)));
        let call = b.call(None, "f", vec![]);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(call)]);
        let errors = analyze(&b, vec![f, main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::WrongArgumentCount { expected: 1, found: 0, .. }
        ));
    }

    #[test]
    fn forward_reference_to_later_function() {
        // void main() { f(); } void f() {}
        let mut b = AstBuilder::new();
        let call = b.call(None, "f", vec![]);
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(call)]);
        let void = b.ty(TypeExprKind::Void);
        let fbody = b.block(vec![], vec![]);
        let f = Decl::Func(b.func("f", void, vec![], Some(fbody)));
        assert!(analyze(&b, vec![main, f]).is_ok());
    }

    #[test]
    fn inherited_variable_must_not_be_shadowed() {
        let mut b = AstBuilder::new();
        let t1 = b.ty(TypeExprKind::Int);
        let v1 = Decl::Var(b.var_decl("v", t1));
        let class_a = Decl::Class(b.class("A", None, vec![], vec![v1]));
        let t2 = b.ty(TypeExprKind::Int);
        let v2 = Decl::Var(b.var_decl("v", t2));
        let class_b = Decl::Class(b.class("B", Some("A"), vec![], vec![v2]));
        let main = empty_main(&mut b);
        let errors = analyze(&b, vec![class_a, class_b, main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::InheritedMemberShadowed { .. }
        ));
    }

    #[test]
    fn override_must_keep_signature() {
        let method = |b: &mut AstBuilder, ret: TypeExprKind, name: &str| {
            let r = b.ty(ret);
            let body = b.block(vec![], vec![]);
            Decl::Func(b.func(name, r, vec![], Some(body)))
        };
        let mut b = AstBuilder::new();
        let f1 = method(&mut b, TypeExprKind::Void, "f");
        let class_a = Decl::Class(b.class("A", None, vec![], vec![f1]));
        let f2 = method(&mut b, TypeExprKind::Int, "f");
        let class_b = Decl::Class(b.class("B", Some("A"), vec![], vec![f2]));
        let main = empty_main(&mut b);
        let errors = analyze(&b, vec![class_a, class_b, main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::OverrideSignatureMismatch { .. }
        ));
    }

    #[test]
    fn interface_methods_must_be_implemented() {
        let mut b = AstBuilder::new();
        let int = b.ty(TypeExprKind::Int);
        let proto = b.func("g", int, vec![], None);
        let iface = Decl::Interface(b.interface("I", vec![proto]));
        let class_c = Decl::Class(b.class("C", None, vec!["I"], vec![]));
        let main = empty_main(&mut b);
        let errors = analyze(&b, vec![iface, class_c, main]).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::MissingInterfaceMethod { .. }
        ));
    }

    #[test]
    fn field_access_outside_class_scope_is_inaccessible() {
        // class A { int x; }  void main() { A a; a = new A; a.x = 1; }
        let mut b = AstBuilder::new();
        let tx = b.ty(TypeExprKind::Int);
        let x = Decl::Var(b.var_decl("x", tx));
        let class_a = Decl::Class(b.class("A", None, vec![], vec![x]));
        let ta = b.named_ty("A");
        let a = b.var_decl("a", ta);
        let ar = b.var_ref("a");
        let cls = b.ident("A");
        let new_a = b.expr(ExprKind::New { class: cls });
        let init = b.assign(ar, new_a);
        let ar2 = b.var_ref("a");
        let access = b.field(ar2, "x");
        let one = b.int(1);
        let write = b.assign(access, one);
        let main = main_with(&mut b, vec![a], vec![Stmt::Expr(init), Stmt::Expr(write)]);
        let errors = analyze(&b, vec![class_a, main]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::InaccessibleField { .. })));
    }

    #[test]
    fn double_declarations_are_rejected_in_the_typing_pass() {
        // double d; d = -d;  (the arithmetic itself is well-typed)
        let mut b = AstBuilder::new();
        let td = b.ty(TypeExprKind::Double);
        let d = b.var_decl("d", td);
        let dr = b.var_ref("d");
        let dr2 = b.var_ref("d");
        let neg = b.expr(ExprKind::Unary {
            op: UnOp::Neg,
            operand: Box::new(dr2),
        });
        let assign = Stmt::Expr(b.assign(dr, neg));
        let main = main_with(&mut b, vec![d], vec![assign]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert_eq!(errors.len(), 1, "only the declaration is flagged");
        assert!(matches!(errors[0], SemanticError::UnsupportedDouble { .. }));
    }

    #[test]
    fn double_literal_is_rejected() {
        let mut b = AstBuilder::new();
        let lit = b.expr(ExprKind::DoubleLit(1.5));
        let neg = b.expr(ExprKind::Unary {
            op: UnOp::Neg,
            operand: Box::new(lit),
        });
        let main = main_with(&mut b, vec![], vec![Stmt::Expr(neg)]);
        let errors = analyze(&b, vec![main]).unwrap_err();
        assert!(matches!(errors[0], SemanticError::UnsupportedDouble { .. }));
    }

    #[test]
    fn null_assigns_to_object_references() {
        let mut b = AstBuilder::new();
        let tx = b.ty(TypeExprKind::Int);
        let x = Decl::Var(b.var_decl("x", tx));
        let class_a = Decl::Class(b.class("A", None, vec![], vec![x]));
        let ta = b.named_ty("A");
        let a = b.var_decl("a", ta);
        let ar = b.var_ref("a");
        let null = b.expr(ExprKind::NullLit);
        let assign = b.assign(ar, null);
        let main = main_with(&mut b, vec![a], vec![Stmt::Expr(assign)]);
        assert!(analyze(&b, vec![class_a, main]).is_ok());
    }
}
