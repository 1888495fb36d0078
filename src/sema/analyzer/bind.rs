// src/sema/analyzer/bind.rs
//
// Pass 1: symbol construction and declaration binding.
//
// `build_symbols` populates the scope stack and the declaration arena,
// reporting same-scope redeclarations. `bind_program` then re-traverses the
// AST resolving every reference (named types, bare variable reads, free
// calls, `new`) and stamping literal types.

use crate::errors::SemanticError;
use crate::frontend::ast::*;
use crate::sema::analyzer::Analyzer;
use crate::sema::decl_table::{
    ClassData, DeclData, DeclId, FuncData, ImplementsVec, InterfaceData, TyState, VarData,
};
use crate::sema::types::Ty;

/// What a named-type reference is required to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedUse {
    Type,
    Class,
    Interface,
}

impl Analyzer<'_> {
    // ---- symbol construction ------------------------------------------

    pub(crate) fn build_symbols(&mut self, program: &Program) {
        for decl in &program.decls {
            self.build_decl(decl, None);
        }
    }

    fn build_decl(&mut self, decl: &Decl, owner: Option<Symbol>) {
        match decl {
            Decl::Var(v) => {
                self.build_var(v);
            }
            Decl::Func(f) => {
                self.build_func(f, owner);
            }
            Decl::Class(c) => self.build_class(c),
            Decl::Interface(i) => self.build_interface(i),
        }
    }

    fn declare(&mut self, name: &Ident, data: DeclData) -> Option<DeclId> {
        if self.symbols.local_lookup(name.sym).is_some() {
            self.add_error(SemanticError::DeclarationConflict {
                name: self.name(name.sym),
                span: name.span.into(),
            });
            return None;
        }
        let id = self.decls.alloc(data);
        self.symbols.insert(name.sym, id);
        self.decl_of.insert(name.id, id);
        Some(id)
    }

    pub(crate) fn build_var(&mut self, v: &VarDecl) -> Option<DeclId> {
        self.declare(
            &v.name,
            DeclData::Var(VarData {
                name: v.name.sym,
                ty: lower_type_expr(&v.ty),
                state: TyState::Unchecked,
                node: v.id,
            }),
        )
    }

    fn build_func(&mut self, f: &FuncDecl, owner: Option<Symbol>) -> Option<DeclId> {
        let id = self.declare(
            &f.name,
            DeclData::Func(FuncData {
                name: f.name.sym,
                ret: lower_type_expr(&f.return_ty),
                ret_state: TyState::Unchecked,
                formals: Vec::new(),
                has_body: f.body.is_some(),
                owner,
                node: f.id,
            }),
        );

        self.symbols.build_scope();
        for formal in &f.formals {
            let formal_id = self.build_var(formal);
            if let (Some(func), Some(formal_id)) = (id, formal_id) {
                if let DeclData::Func(data) = self.decls.get_mut(func) {
                    data.formals.push(formal_id);
                }
            }
        }
        if let Some(body) = &f.body {
            self.build_block(body);
        }
        self.symbols.exit_scope();
        id
    }

    fn build_class(&mut self, c: &ClassDecl) {
        let id = self.declare(
            &c.name,
            DeclData::Class(ClassData {
                name: c.name.sym,
                extends: c.extends.as_ref().map(|e| e.sym),
                implements: c.implements.iter().map(|i| i.sym).collect::<ImplementsVec>(),
                members: Vec::new(),
                node: c.id,
            }),
        );

        self.symbols.build_scope_for(c.name.sym);
        if let Some(extends) = &c.extends {
            self.symbols.set_scope_parent(extends.sym);
        }
        for interface in &c.implements {
            self.symbols.add_interface(interface.sym);
        }
        for member in &c.members {
            let member_id = match member {
                Decl::Var(v) => self.build_var(v),
                Decl::Func(f) => self.build_func(f, Some(c.name.sym)),
                // The grammar admits only variables and methods as members
                other => {
                    self.build_decl(other, Some(c.name.sym));
                    None
                }
            };
            if let (Some(class), Some(member_id)) = (id, member_id) {
                if let DeclData::Class(data) = self.decls.get_mut(class) {
                    data.members.push(member_id);
                }
            }
        }
        self.symbols.exit_scope();
    }

    fn build_interface(&mut self, i: &InterfaceDecl) {
        let id = self.declare(
            &i.name,
            DeclData::Interface(InterfaceData {
                name: i.name.sym,
                members: Vec::new(),
                node: i.id,
            }),
        );

        self.symbols.build_scope_for(i.name.sym);
        for member in &i.members {
            let member_id = self.build_func(member, Some(i.name.sym));
            if let (Some(interface), Some(member_id)) = (id, member_id) {
                if let DeclData::Interface(data) = self.decls.get_mut(interface) {
                    data.members.push(member_id);
                }
            }
        }
        self.symbols.exit_scope();
    }

    fn build_block(&mut self, block: &Block) {
        self.symbols.build_scope();
        for decl in &block.decls {
            self.build_var(decl);
        }
        for stmt in &block.stmts {
            self.build_stmt(stmt);
        }
        self.symbols.exit_scope();
    }

    fn build_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.build_block(b),
            Stmt::If(s) => {
                self.symbols.build_scope();
                self.build_stmt(&s.then_body);
                self.symbols.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.symbols.build_scope();
                    self.build_stmt(else_body);
                    self.symbols.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.symbols.build_scope();
                self.build_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::For(s) => {
                self.symbols.build_scope();
                self.build_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::Switch(s) => {
                self.symbols.build_scope();
                for case in &s.cases {
                    self.symbols.build_scope();
                    for stmt in &case.stmts {
                        self.build_stmt(stmt);
                    }
                    self.symbols.exit_scope();
                }
                self.symbols.exit_scope();
            }
            // No declarations inside these
            Stmt::Break(_) | Stmt::Return(_) | Stmt::Print(_) | Stmt::Expr(_) => {}
        }
    }

    // ---- declaration binding ------------------------------------------

    pub(crate) fn bind_program(&mut self, program: &Program) {
        for decl in &program.decls {
            self.bind_decl(decl);
        }
    }

    fn bind_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.bind_var(v),
            Decl::Func(f) => self.bind_func(f),
            Decl::Class(c) => self.bind_class(c),
            Decl::Interface(i) => self.bind_interface(i),
        }
    }

    fn bind_var(&mut self, v: &VarDecl) {
        let valid = self.resolve_type_expr(&v.ty, NamedUse::Type);
        self.bind_own_ident(&v.name);
        if let Some(&id) = self.decl_of.get(&v.name.id) {
            if let DeclData::Var(data) = self.decls.get_mut(id) {
                data.state = if valid { TyState::Valid } else { TyState::Invalid };
            }
        }
    }

    fn bind_func(&mut self, f: &FuncDecl) {
        let ret_valid = self.resolve_type_expr(&f.return_ty, NamedUse::Type);
        self.bind_own_ident(&f.name);
        if let Some(&id) = self.decl_of.get(&f.name.id) {
            if let DeclData::Func(data) = self.decls.get_mut(id) {
                data.ret_state = if ret_valid { TyState::Valid } else { TyState::Invalid };
            }
        }

        self.symbols.enter_scope();
        for formal in &f.formals {
            self.bind_var(formal);
        }
        if let Some(body) = &f.body {
            self.bind_block(body);
        }
        self.symbols.exit_scope();

        if self.interner.resolve(f.name.sym) == "main" && !f.formals.is_empty() {
            self.add_error(SemanticError::MainHasParameters {
                span: f.name.span.into(),
            });
        }
    }

    fn bind_class(&mut self, c: &ClassDecl) {
        self.bind_own_ident(&c.name);
        if let Some(extends) = &c.extends {
            self.resolve_named_ident(extends, NamedUse::Class);
        }
        for interface in &c.implements {
            self.resolve_named_ident(interface, NamedUse::Interface);
        }
        self.symbols.enter_scope();
        for member in &c.members {
            self.bind_decl(member);
        }
        self.symbols.exit_scope();
    }

    fn bind_interface(&mut self, i: &InterfaceDecl) {
        self.bind_own_ident(&i.name);
        self.symbols.enter_scope();
        for member in &i.members {
            self.bind_func(member);
        }
        self.symbols.exit_scope();
    }

    /// Re-resolve a declaration's own identifier through the scope stack,
    /// as the original does; a conflicting declaration resolves to the
    /// surviving binding instead of itself.
    fn bind_own_ident(&mut self, ident: &Ident) {
        match self.symbols.lookup(ident.sym) {
            Some(id) => {
                self.decl_of.insert(ident.id, id);
            }
            None => self.add_error(SemanticError::UndeclaredIdentifier {
                name: self.name(ident.sym),
                span: ident.span.into(),
            }),
        }
    }

    /// Resolve a class/interface name reference with a kind requirement.
    pub(crate) fn resolve_named_ident(&mut self, ident: &Ident, usage: NamedUse) -> bool {
        let Some(id) = self.symbols.lookup(ident.sym) else {
            self.add_error(SemanticError::UndeclaredIdentifier {
                name: self.name(ident.sym),
                span: ident.span.into(),
            });
            return false;
        };
        let ok = match usage {
            NamedUse::Type => self.decls.is_class(id) || self.decls.is_interface(id),
            NamedUse::Class => self.decls.is_class(id),
            NamedUse::Interface => self.decls.is_interface(id),
        };
        if !ok {
            let expected = match usage {
                NamedUse::Type => "a class or interface name",
                NamedUse::Class => "a class name",
                NamedUse::Interface => "an interface name",
            };
            self.add_error(SemanticError::WrongKindIdentifier {
                name: self.name(ident.sym),
                expected,
                span: ident.span.into(),
            });
            return false;
        }
        self.decl_of.insert(ident.id, id);
        true
    }

    /// Validate a type annotation; records the semantic type of the type
    /// node when it is valid. Invalid annotations leave no entry, so uses
    /// of the annotated declaration sink.
    pub(crate) fn resolve_type_expr(&mut self, ty: &TypeExpr, usage: NamedUse) -> bool {
        let valid = match &ty.kind {
            TypeExprKind::Named(ident) => self.resolve_named_ident(ident, usage),
            TypeExprKind::Array(elem) => self.resolve_type_expr(elem, NamedUse::Type),
            _ => true,
        };
        if valid {
            self.ty_of.insert(ty.id, lower_type_expr(ty));
        }
        valid
    }

    fn bind_block(&mut self, block: &Block) {
        self.symbols.enter_scope();
        for decl in &block.decls {
            self.bind_var(decl);
        }
        for stmt in &block.stmts {
            self.bind_stmt(stmt);
        }
        self.symbols.exit_scope();
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.bind_block(b),
            Stmt::If(s) => {
                self.bind_expr(&s.test);
                self.symbols.enter_scope();
                self.bind_stmt(&s.then_body);
                self.symbols.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.symbols.enter_scope();
                    self.bind_stmt(else_body);
                    self.symbols.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.bind_expr(&s.test);
                self.symbols.enter_scope();
                self.bind_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::For(s) => {
                self.bind_expr(&s.init);
                self.bind_expr(&s.test);
                self.bind_expr(&s.step);
                self.symbols.enter_scope();
                self.bind_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::Switch(s) => {
                self.bind_expr(&s.subject);
                self.symbols.enter_scope();
                for case in &s.cases {
                    if let Some(value) = &case.value {
                        self.bind_expr(value);
                    }
                    self.symbols.enter_scope();
                    for stmt in &case.stmts {
                        self.bind_stmt(stmt);
                    }
                    self.symbols.exit_scope();
                }
                self.symbols.exit_scope();
            }
            Stmt::Break(_) => {}
            Stmt::Return(s) => self.bind_expr(&s.value),
            Stmt::Print(s) => {
                for arg in &s.args {
                    self.bind_expr(arg);
                }
            }
            Stmt::Expr(e) => self.bind_expr(e),
        }
    }

    fn bind_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Empty | ExprKind::This | ExprKind::ReadInteger | ExprKind::ReadLine => {}
            ExprKind::IntLit(_) => {
                self.ty_of.insert(expr.id, Ty::Int);
            }
            ExprKind::DoubleLit(_) => {
                self.ty_of.insert(expr.id, Ty::Double);
            }
            ExprKind::BoolLit(_) => {
                self.ty_of.insert(expr.id, Ty::Bool);
            }
            ExprKind::StringLit(_) => {
                self.ty_of.insert(expr.id, Ty::String);
            }
            ExprKind::NullLit => {
                self.ty_of.insert(expr.id, Ty::Null);
            }
            ExprKind::Field { base, field } => match base {
                Some(base) => self.bind_expr(base),
                None => match self.symbols.lookup(field.sym) {
                    Some(id) => {
                        self.decl_of.insert(field.id, id);
                    }
                    None => self.add_error(SemanticError::UndeclaredIdentifier {
                        name: self.name(field.sym),
                        span: field.span.into(),
                    }),
                },
            },
            ExprKind::Call { base, method, args } => {
                match base {
                    Some(base) => self.bind_expr(base),
                    None => match self.symbols.lookup(method.sym) {
                        None => self.add_error(SemanticError::UndeclaredIdentifier {
                            name: self.name(method.sym),
                            span: method.span.into(),
                        }),
                        Some(id) if !self.decls.is_func(id) => {
                            self.add_error(SemanticError::NotAFunction {
                                name: self.name(method.sym),
                                span: method.span.into(),
                            })
                        }
                        Some(id) => {
                            self.decl_of.insert(method.id, id);
                            // Forward references within a scope pick their
                            // type up in the typing pass instead
                            if let Some(ret) = self.decls.func_ret_ty(id) {
                                self.ty_of.insert(expr.id, ret);
                            }
                        }
                    },
                }
                for arg in args {
                    self.bind_expr(arg);
                }
            }
            ExprKind::ArrayAccess { base, subscript } => {
                self.bind_expr(base);
                self.bind_expr(subscript);
            }
            ExprKind::Unary { operand, .. } => self.bind_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.bind_expr(left);
                self.bind_expr(right);
            }
            ExprKind::Assign { target, value } => {
                self.bind_expr(target);
                self.bind_expr(value);
            }
            ExprKind::Postfix { target, .. } => self.bind_expr(target),
            ExprKind::New { class } => {
                self.resolve_named_ident(class, NamedUse::Class);
            }
            ExprKind::NewArray { size, elem } => {
                self.bind_expr(size);
                self.resolve_type_expr(elem, NamedUse::Type);
            }
        }
    }
}

/// Structural conversion of a type annotation; validity is checked
/// separately by `resolve_type_expr`.
pub(crate) fn lower_type_expr(ty: &TypeExpr) -> Ty {
    match &ty.kind {
        TypeExprKind::Int => Ty::Int,
        TypeExprKind::Double => Ty::Double,
        TypeExprKind::Bool => Ty::Bool,
        TypeExprKind::String => Ty::String,
        TypeExprKind::Void => Ty::Void,
        TypeExprKind::Named(ident) => Ty::Named(ident.sym),
        TypeExprKind::Array(elem) => Ty::Array(Box::new(lower_type_expr(elem))),
    }
}
