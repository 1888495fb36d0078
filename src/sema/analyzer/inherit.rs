// src/sema/analyzer/inherit.rs
//
// Pass 2: inheritance checking. For every class: a member variable must not
// shadow anything inherited (from the superclass chain or an implemented
// interface); a member method may override only with an identical
// signature; and every method of every implemented interface must have a
// matching implementation reachable from the class.
//
// The pass still walks function bodies (doing nothing in them) so the
// scope-enter cursor stays aligned with the shape pass 1 built.

use crate::errors::SemanticError;
use crate::frontend::ast::*;
use crate::sema::analyzer::Analyzer;
use crate::sema::decl_table::{DeclId, TyState};

impl Analyzer<'_> {
    pub(crate) fn inherit_program(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(_) => {}
                Decl::Func(f) => self.walk_func(f),
                Decl::Class(c) => self.inherit_class(c),
                Decl::Interface(i) => {
                    self.symbols.enter_scope();
                    for member in &i.members {
                        self.walk_func(member);
                    }
                    self.symbols.exit_scope();
                }
            }
        }
    }

    fn inherit_class(&mut self, c: &ClassDecl) {
        self.symbols.enter_scope();

        for member in &c.members {
            match member {
                Decl::Var(v) => {
                    if self.symbols.lookup_parent(v.name.sym).is_some()
                        || self.symbols.lookup_interface(v.name.sym).is_some()
                    {
                        self.add_error(SemanticError::InheritedMemberShadowed {
                            name: self.name(v.name.sym),
                            span: v.name.span.into(),
                        });
                    }
                }
                Decl::Func(f) => {
                    let own = self.decl_of.get(&f.name.id).copied();

                    if let Some(inherited) = self.symbols.lookup_parent(f.name.sym) {
                        if !self.decls.is_func(inherited) {
                            self.add_error(SemanticError::InheritedMemberShadowed {
                                name: self.name(f.name.sym),
                                span: f.name.span.into(),
                            });
                        } else {
                            self.check_override(f, own, inherited);
                        }
                    }

                    if let Some(inherited) = self.symbols.lookup_interface(f.name.sym) {
                        self.check_override(f, own, inherited);
                    }

                    self.walk_func(f);
                }
                _ => {}
            }
        }

        for interface in &c.implements {
            self.check_interface_implemented(c, interface);
        }

        self.symbols.exit_scope();
    }

    /// Both signatures must match exactly; skipped while either return
    /// type failed validation (those already carry diagnostics).
    fn check_override(&mut self, f: &FuncDecl, own: Option<DeclId>, inherited: DeclId) {
        let Some(own) = own else { return };
        let ret_checked = |a: &Analyzer, id: DeclId| {
            a.decls
                .as_func(id)
                .is_some_and(|d| d.ret_state == TyState::Valid)
        };
        if !ret_checked(self, own) || !ret_checked(self, inherited) {
            return;
        }
        if !self.decls.signatures_equivalent(own, inherited) {
            self.add_error(SemanticError::OverrideSignatureMismatch {
                name: self.name(f.name.sym),
                span: f.name.span.into(),
            });
        }
    }

    fn check_interface_implemented(&mut self, c: &ClassDecl, interface: &Ident) {
        let Some(interface_id) = self.decl_of.get(&interface.id).copied() else {
            return;
        };
        let Some(members) = self.decls.as_interface(interface_id).map(|i| i.members.clone())
        else {
            return;
        };

        for proto in members {
            let method = self.decls.name_of(proto);
            let missing = SemanticError::MissingInterfaceMethod {
                class: self.name(c.name.sym),
                interface: self.name(interface.sym),
                method: self.name(method),
                span: c.name.span.into(),
            };
            match self.symbols.lookup_field(c.name.sym, method) {
                None => self.add_error(missing),
                Some(implementation) => {
                    let ok = self.decls.is_func(implementation)
                        && self
                            .decls
                            .as_func(implementation)
                            .is_some_and(|d| d.ret_state == TyState::Valid)
                        && self
                            .decls
                            .as_func(proto)
                            .is_some_and(|d| d.ret_state == TyState::Valid)
                        && self.decls.signatures_equivalent(proto, implementation);
                    if !ok {
                        self.add_error(missing);
                    }
                }
            }
        }
    }

    /// Enter and leave a function's scopes without doing any checking;
    /// keeps the cursor in step for the statements that own scopes.
    fn walk_func(&mut self, f: &FuncDecl) {
        self.symbols.enter_scope();
        if let Some(body) = &f.body {
            self.walk_block(body);
        }
        self.symbols.exit_scope();
    }

    fn walk_block(&mut self, block: &Block) {
        self.symbols.enter_scope();
        for stmt in &block.stmts {
            self.walk_stmt(stmt);
        }
        self.symbols.exit_scope();
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.walk_block(b),
            Stmt::If(s) => {
                self.symbols.enter_scope();
                self.walk_stmt(&s.then_body);
                self.symbols.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.symbols.enter_scope();
                    self.walk_stmt(else_body);
                    self.symbols.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.symbols.enter_scope();
                self.walk_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::For(s) => {
                self.symbols.enter_scope();
                self.walk_stmt(&s.body);
                self.symbols.exit_scope();
            }
            Stmt::Switch(s) => {
                self.symbols.enter_scope();
                for case in &s.cases {
                    self.symbols.enter_scope();
                    for stmt in &case.stmts {
                        self.walk_stmt(stmt);
                    }
                    self.symbols.exit_scope();
                }
                self.symbols.exit_scope();
            }
            Stmt::Break(_) | Stmt::Return(_) | Stmt::Print(_) | Stmt::Expr(_) => {}
        }
    }
}
