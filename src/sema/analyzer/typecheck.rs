// src/sema/analyzer/typecheck.rs
//
// Pass 3: bottom-up typing of every expression, plus the statement-level
// rules (bool tests, break placement, return compatibility, printable
// arguments). A node whose operands failed to type leaves no entry in
// `ty_of` and raises no further diagnostics.

use crate::errors::SemanticError;
use crate::frontend::ast::*;
use crate::sema::analyzer::Analyzer;
use crate::sema::compatibility::compatible;
use crate::sema::types::Ty;

impl Analyzer<'_> {
    pub(crate) fn typecheck_program(&mut self, program: &Program) {
        for decl in &program.decls {
            self.typecheck_decl(decl);
        }
    }

    fn typecheck_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.check_double_free(&v.ty),
            Decl::Func(f) => self.typecheck_func(f),
            Decl::Class(c) => {
                self.symbols.enter_scope();
                for member in &c.members {
                    self.typecheck_decl(member);
                }
                self.symbols.exit_scope();
            }
            Decl::Interface(i) => {
                self.symbols.enter_scope();
                for member in &i.members {
                    self.typecheck_func(member);
                }
                self.symbols.exit_scope();
            }
        }
    }

    fn typecheck_func(&mut self, f: &FuncDecl) {
        self.check_double_free(&f.return_ty);
        for formal in &f.formals {
            self.check_double_free(&formal.ty);
        }
        let previous = self.current_function;
        self.current_function = self.decl_of.get(&f.name.id).copied();
        self.symbols.enter_scope();
        if let Some(body) = &f.body {
            self.typecheck_block(body);
        }
        self.symbols.exit_scope();
        self.current_function = previous;
    }

    fn typecheck_block(&mut self, block: &Block) {
        self.symbols.enter_scope();
        for decl in &block.decls {
            self.check_double_free(&decl.ty);
        }
        for stmt in &block.stmts {
            self.typecheck_stmt(stmt);
        }
        self.symbols.exit_scope();
    }

    /// `double` is parsed and participates in the typing rules, but no
    /// later phase can lower it; reject every double-typed declaration
    /// here so nothing double-typed survives analysis.
    fn check_double_free(&mut self, ty: &TypeExpr) {
        if type_expr_has_double(ty) {
            self.add_error(SemanticError::UnsupportedDouble {
                span: ty.span.into(),
            });
        }
    }

    fn check_test_is_bool(&mut self, test: &Expr) {
        let ty = self.type_of_expr(test);
        if let Some(ty) = ty {
            if ty != Ty::Bool {
                self.add_error(SemanticError::TestNotBool {
                    found: self.ty_name(&ty),
                    span: test.span.into(),
                });
            }
        }
    }

    fn typecheck_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.typecheck_block(b),
            Stmt::If(s) => {
                self.check_test_is_bool(&s.test);
                self.symbols.enter_scope();
                self.typecheck_stmt(&s.then_body);
                self.symbols.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.symbols.enter_scope();
                    self.typecheck_stmt(else_body);
                    self.symbols.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.check_test_is_bool(&s.test);
                self.symbols.enter_scope();
                self.break_depth += 1;
                self.typecheck_stmt(&s.body);
                self.break_depth -= 1;
                self.symbols.exit_scope();
            }
            Stmt::For(s) => {
                self.type_of_expr(&s.init);
                self.check_test_is_bool(&s.test);
                self.type_of_expr(&s.step);
                self.symbols.enter_scope();
                self.break_depth += 1;
                self.typecheck_stmt(&s.body);
                self.break_depth -= 1;
                self.symbols.exit_scope();
            }
            Stmt::Switch(s) => {
                self.type_of_expr(&s.subject);
                self.symbols.enter_scope();
                for case in &s.cases {
                    if let Some(value) = &case.value {
                        self.type_of_expr(value);
                    }
                    self.symbols.enter_scope();
                    self.break_depth += 1;
                    for stmt in &case.stmts {
                        self.typecheck_stmt(stmt);
                    }
                    self.break_depth -= 1;
                    self.symbols.exit_scope();
                }
                self.symbols.exit_scope();
            }
            Stmt::Break(s) => {
                if self.break_depth == 0 {
                    self.add_error(SemanticError::BreakOutsideLoop {
                        span: s.span.into(),
                    });
                }
            }
            Stmt::Return(s) => {
                let given = self.type_of_expr(&s.value);
                let expected = self
                    .current_function
                    .and_then(|f| self.decls.func_ret_ty(f));
                if let (Some(expected), Some(given)) = (expected, given) {
                    if !compatible(&expected, &given, &self.decls) {
                        self.add_error(SemanticError::ReturnTypeMismatch {
                            expected: self.ty_name(&expected),
                            found: self.ty_name(&given),
                            span: s.span.into(),
                        });
                    }
                }
            }
            Stmt::Print(s) => {
                for arg in &s.args {
                    let ty = self.type_of_expr(arg);
                    if let Some(ty) = ty {
                        if !matches!(ty, Ty::Int | Ty::Bool | Ty::String) {
                            self.add_error(SemanticError::UnprintableType {
                                found: self.ty_name(&ty),
                                span: arg.span.into(),
                            });
                        }
                    }
                }
            }
            Stmt::Expr(e) => {
                self.type_of_expr(e);
            }
        }
    }

    fn set_ty(&mut self, expr: &Expr, ty: Ty) -> Option<Ty> {
        self.ty_of.insert(expr.id, ty.clone());
        Some(ty)
    }

    /// Compute (and record) an expression's semantic type. Returns None
    /// when the expression cannot be typed; callers skip their own checks
    /// in that case.
    fn type_of_expr(&mut self, expr: &Expr) -> Option<Ty> {
        match &expr.kind {
            ExprKind::Empty => self.set_ty(expr, Ty::Void),

            // Stamped by the binder
            ExprKind::IntLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::NullLit => self.ty_of.get(&expr.id).cloned(),

            // Typed like any literal, but the value itself is unsupported
            ExprKind::DoubleLit(_) => {
                self.add_error(SemanticError::UnsupportedDouble {
                    span: expr.span.into(),
                });
                self.ty_of.get(&expr.id).cloned()
            }

            ExprKind::ReadInteger => self.set_ty(expr, Ty::Int),
            ExprKind::ReadLine => self.set_ty(expr, Ty::String),

            ExprKind::This => {
                let class = self
                    .symbols
                    .lookup_this()
                    .filter(|&d| self.decls.is_class(d));
                match class {
                    Some(d) => {
                        let name = self.decls.name_of(d);
                        self.set_ty(expr, Ty::Named(name))
                    }
                    None => {
                        self.add_error(SemanticError::ThisOutsideClass {
                            span: expr.span.into(),
                        });
                        None
                    }
                }
            }

            ExprKind::Field { base: None, field } => {
                let decl = self.decl_of.get(&field.id).copied()?;
                if self.decls.is_var(decl) {
                    let ty = self.decls.var_ty(decl)?;
                    self.set_ty(expr, ty)
                } else {
                    self.add_error(SemanticError::WrongKindIdentifier {
                        name: self.name(field.sym),
                        expected: "a variable",
                        span: field.span.into(),
                    });
                    None
                }
            }

            ExprKind::Field {
                base: Some(base),
                field,
            } => self.type_field_access(expr, base, field),

            ExprKind::Call { base, method, args } => {
                self.type_call(expr, base.as_deref(), method, args)
            }

            ExprKind::ArrayAccess { base, subscript } => {
                let sub_ty = self.type_of_expr(subscript);
                if let Some(sub_ty) = sub_ty {
                    if sub_ty != Ty::Int {
                        self.add_error(SemanticError::SubscriptNotInt {
                            found: self.ty_name(&sub_ty),
                            span: subscript.span.into(),
                        });
                    }
                }
                let base_ty = self.type_of_expr(base)?;
                match base_ty.elem() {
                    Some(elem) => {
                        let elem = elem.clone();
                        self.set_ty(expr, elem)
                    }
                    None => {
                        self.add_error(SemanticError::NotAnArray {
                            found: self.ty_name(&base_ty),
                            span: base.span.into(),
                        });
                        None
                    }
                }
            }

            ExprKind::Unary { op, operand } => {
                let ty = self.type_of_expr(operand);
                match op {
                    UnOp::Neg => {
                        let ty = ty?;
                        if ty.is_numeric() {
                            self.set_ty(expr, ty)
                        } else {
                            self.add_error(SemanticError::InvalidUnaryOperand {
                                op: "-",
                                found: self.ty_name(&ty),
                                span: expr.span.into(),
                            });
                            None
                        }
                    }
                    UnOp::Not => {
                        // Result is bool even when the operand is not
                        if let Some(ty) = ty {
                            if ty != Ty::Bool {
                                self.add_error(SemanticError::InvalidUnaryOperand {
                                    op: "!",
                                    found: self.ty_name(&ty),
                                    span: expr.span.into(),
                                });
                            }
                        }
                        self.set_ty(expr, Ty::Bool)
                    }
                }
            }

            ExprKind::Binary { op, left, right } => {
                let tl = self.type_of_expr(left);
                let tr = self.type_of_expr(right);
                self.type_binary(expr, *op, tl, tr)
            }

            ExprKind::Assign { target, value } => {
                let tl = self.type_of_expr(target);
                let tr = self.type_of_expr(value);
                if let (Some(tl), Some(tr)) = (tl, tr) {
                    if !compatible(&tl, &tr, &self.decls) {
                        self.add_error(SemanticError::IncompatibleAssignment {
                            expected: self.ty_name(&tl),
                            found: self.ty_name(&tr),
                            span: expr.span.into(),
                        });
                    }
                }
                // Assignment produces no value of its own
                None
            }

            ExprKind::Postfix { op, target } => {
                let ty = self.type_of_expr(target)?;
                if ty == Ty::Int {
                    self.set_ty(expr, Ty::Int)
                } else {
                    self.add_error(SemanticError::InvalidUnaryOperand {
                        op: match op {
                            PostOp::Inc => "++",
                            PostOp::Dec => "--",
                        },
                        found: self.ty_name(&ty),
                        span: expr.span.into(),
                    });
                    None
                }
            }

            ExprKind::New { class } => {
                self.decl_of.get(&class.id)?;
                self.set_ty(expr, Ty::Named(class.sym))
            }

            ExprKind::NewArray { size, elem } => {
                let size_ty = self.type_of_expr(size);
                if let Some(size_ty) = size_ty {
                    if size_ty != Ty::Int {
                        self.add_error(SemanticError::ArraySizeNotInt {
                            found: self.ty_name(&size_ty),
                            span: size.span.into(),
                        });
                    }
                }
                self.check_double_free(elem);
                let elem_ty = self.ty_of.get(&elem.id).cloned()?;
                self.set_ty(expr, Ty::Array(Box::new(elem_ty)))
            }
        }
    }

    fn type_binary(
        &mut self,
        expr: &Expr,
        op: BinOp,
        tl: Option<Ty>,
        tr: Option<Ty>,
    ) -> Option<Ty> {
        let operand_error = |a: &mut Self, tl: &Ty, tr: &Ty| {
            a.add_error(SemanticError::InvalidOperands {
                op: op.symbol(),
                left: a.ty_name(tl),
                right: a.ty_name(tr),
                span: expr.span.into(),
            });
        };

        match op.kind() {
            BinOpKind::Arithmetic => {
                let (tl, tr) = (tl?, tr?);
                match (&tl, &tr) {
                    (&Ty::Int, &Ty::Int) => self.set_ty(expr, Ty::Int),
                    (&Ty::Double, &Ty::Double) => self.set_ty(expr, Ty::Double),
                    _ => {
                        operand_error(self, &tl, &tr);
                        None
                    }
                }
            }
            BinOpKind::Relational => {
                if let (Some(tl), Some(tr)) = (&tl, &tr) {
                    let ok = matches!((tl, tr), (&Ty::Int, &Ty::Int) | (&Ty::Double, &Ty::Double));
                    if !ok {
                        operand_error(self, tl, tr);
                    }
                }
                self.set_ty(expr, Ty::Bool)
            }
            BinOpKind::Equality => {
                if let (Some(tl), Some(tr)) = (&tl, &tr) {
                    if !compatible(tl, tr, &self.decls) && !compatible(tr, tl, &self.decls) {
                        operand_error(self, tl, tr);
                    }
                }
                self.set_ty(expr, Ty::Bool)
            }
            BinOpKind::Logical => {
                if let (Some(tl), Some(tr)) = (&tl, &tr) {
                    if *tl != Ty::Bool || *tr != Ty::Bool {
                        operand_error(self, tl, tr);
                    }
                }
                self.set_ty(expr, Ty::Bool)
            }
        }
    }

    /// `base.field` where `field` must be a variable member. The member
    /// must exist on the base's class and be visible from the enclosing
    /// class: the two classes must be subtype-related in either direction.
    fn type_field_access(&mut self, expr: &Expr, base: &Expr, field: &Ident) -> Option<Ty> {
        let base_ty = self.type_of_expr(base)?;
        let Some(base_name) = base_ty.named_symbol() else {
            self.add_error(SemanticError::BaseNotObject {
                found: self.ty_name(&base_ty),
                span: base.span.into(),
            });
            return None;
        };

        let member = self.symbols.lookup_field(base_name, field.sym);
        if !member.is_some_and(|d| self.decls.is_var(d)) {
            self.add_error(SemanticError::FieldNotFound {
                class: self.name(base_name),
                field: self.name(field.sym),
                span: field.span.into(),
            });
            return None;
        }

        // Variable members are only visible inside class scope
        let this_class = self
            .symbols
            .lookup_this()
            .filter(|&d| self.decls.is_class(d));
        let Some(this_class) = this_class else {
            self.add_error(SemanticError::InaccessibleField {
                class: self.name(base_name),
                field: self.name(field.sym),
                span: field.span.into(),
            });
            return None;
        };

        let this_name = self.decls.name_of(this_class);
        let through_this = self
            .symbols
            .lookup_field(this_name, field.sym)
            .filter(|&d| self.decls.is_var(d));
        let Some(member) = through_this else {
            self.add_error(SemanticError::InaccessibleField {
                class: self.name(base_name),
                field: self.name(field.sym),
                span: field.span.into(),
            });
            return None;
        };

        let this_ty = Ty::Named(this_name);
        if compatible(&this_ty, &base_ty, &self.decls) || compatible(&base_ty, &this_ty, &self.decls)
        {
            self.decl_of.insert(field.id, member);
            let ty = self.decls.var_ty(member)?;
            self.set_ty(expr, ty)
        } else {
            self.add_error(SemanticError::InaccessibleField {
                class: self.name(base_name),
                field: self.name(field.sym),
                span: field.span.into(),
            });
            None
        }
    }

    fn type_call(
        &mut self,
        expr: &Expr,
        base: Option<&Expr>,
        method: &Ident,
        args: &[Expr],
    ) -> Option<Ty> {
        let mut result = None;

        match base {
            None => {
                // Bound in pass 1; forward references get their type here
                if let Some(&decl) = self.decl_of.get(&method.id) {
                    if !self.ty_of.contains_key(&expr.id) {
                        if let Some(ret) = self.decls.func_ret_ty(decl) {
                            self.ty_of.insert(expr.id, ret);
                        }
                    }
                    result = self.ty_of.get(&expr.id).cloned();
                }
            }
            Some(base_expr) => {
                if let Some(base_ty) = self.type_of_expr(base_expr) {
                    if base_ty.is_array() && self.interner.resolve(method.sym) == "length" {
                        if !args.is_empty() {
                            self.add_error(SemanticError::LengthTakesNoArguments {
                                span: expr.span.into(),
                            });
                        }
                        result = self.set_ty(expr, Ty::Int);
                    } else if let Some(base_name) = base_ty.named_symbol() {
                        let member = self.symbols.lookup_field(base_name, method.sym);
                        match member.filter(|&d| self.decls.is_func(d)) {
                            Some(decl) => {
                                self.decl_of.insert(method.id, decl);
                                if let Some(ret) = self.decls.func_ret_ty(decl) {
                                    result = self.set_ty(expr, ret);
                                }
                            }
                            None => self.add_error(SemanticError::MethodNotFound {
                                class: self.name(base_name),
                                method: self.name(method.sym),
                                span: method.span.into(),
                            }),
                        }
                    } else {
                        self.add_error(SemanticError::BaseNotObject {
                            found: self.ty_name(&base_ty),
                            span: base_expr.span.into(),
                        });
                    }
                }
            }
        }

        for arg in args {
            self.type_of_expr(arg);
        }
        self.check_call_args(expr, method, args);

        result
    }

    fn check_call_args(&mut self, expr: &Expr, method: &Ident, args: &[Expr]) {
        let Some(&decl) = self.decl_of.get(&method.id) else {
            return;
        };
        let Some(func) = self.decls.as_func(decl) else {
            return;
        };
        let formals = func.formals.clone();

        if args.len() != formals.len() {
            self.add_error(SemanticError::WrongArgumentCount {
                expected: formals.len(),
                found: args.len(),
                span: expr.span.into(),
            });
            return;
        }

        for (i, (arg, &formal)) in args.iter().zip(formals.iter()).enumerate() {
            let actual = self.ty_of.get(&arg.id).cloned();
            let expected = self.decls.var_ty(formal);
            if let (Some(expected), Some(actual)) = (expected, actual) {
                if !compatible(&expected, &actual, &self.decls) {
                    self.add_error(SemanticError::ArgumentTypeMismatch {
                        index: i + 1,
                        expected: self.ty_name(&expected),
                        found: self.ty_name(&actual),
                        span: arg.span.into(),
                    });
                }
            }
        }
    }
}

fn type_expr_has_double(ty: &TypeExpr) -> bool {
    match &ty.kind {
        TypeExprKind::Double => true,
        TypeExprKind::Array(elem) => type_expr_has_double(elem),
        _ => false,
    }
}
