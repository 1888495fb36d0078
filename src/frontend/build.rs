// src/frontend/build.rs
//
// AST construction helper. The external parser (and the test suites) go
// through AstBuilder so every node receives a fresh NodeId; analysis side
// tables rely on ids being unique within a program.

use crate::frontend::ast::*;
use crate::frontend::{Interner, Span};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: u32,
    /// Span stamped on nodes built without an explicit position
    pub span: Span,
    pub interner: Interner,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        Ident {
            id: self.node_id(),
            sym: self.interner.intern(name),
            span: self.span,
        }
    }

    pub fn ty(&mut self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            id: self.node_id(),
            kind,
            span: self.span,
        }
    }

    pub fn named_ty(&mut self, name: &str) -> TypeExpr {
        let id = self.ident(name);
        self.ty(TypeExprKind::Named(id))
    }

    pub fn array_ty(&mut self, elem: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Array(Box::new(elem)))
    }

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.node_id(),
            kind,
            span: self.span,
        }
    }

    pub fn empty(&mut self) -> Expr {
        self.expr(ExprKind::Empty)
    }

    pub fn int(&mut self, value: i32) -> Expr {
        self.expr(ExprKind::IntLit(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::StringLit(value.to_string()))
    }

    /// Bare variable reference `x` (field access with no base)
    pub fn var_ref(&mut self, name: &str) -> Expr {
        let field = self.ident(name);
        self.expr(ExprKind::Field { base: None, field })
    }

    pub fn field(&mut self, base: Expr, name: &str) -> Expr {
        let field = self.ident(name);
        self.expr(ExprKind::Field {
            base: Some(Box::new(base)),
            field,
        })
    }

    pub fn call(&mut self, base: Option<Expr>, name: &str, args: Vec<Expr>) -> Expr {
        let method = self.ident(name);
        self.expr(ExprKind::Call {
            base: base.map(Box::new),
            method,
            args,
        })
    }

    pub fn binary(&mut self, op: BinOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn var_decl(&mut self, name: &str, ty: TypeExpr) -> VarDecl {
        VarDecl {
            id: self.node_id(),
            name: self.ident(name),
            ty,
            span: self.span,
        }
    }

    pub fn block(&mut self, decls: Vec<VarDecl>, stmts: Vec<Stmt>) -> Block {
        Block {
            id: self.node_id(),
            decls,
            stmts,
            span: self.span,
        }
    }

    pub fn func(
        &mut self,
        name: &str,
        return_ty: TypeExpr,
        formals: Vec<VarDecl>,
        body: Option<Block>,
    ) -> FuncDecl {
        FuncDecl {
            id: self.node_id(),
            name: self.ident(name),
            return_ty,
            formals,
            body,
            span: self.span,
        }
    }

    pub fn class(
        &mut self,
        name: &str,
        extends: Option<&str>,
        implements: Vec<&str>,
        members: Vec<Decl>,
    ) -> ClassDecl {
        ClassDecl {
            id: self.node_id(),
            name: self.ident(name),
            extends: extends.map(|e| self.ident(e)),
            implements: implements.into_iter().map(|i| self.ident(i)).collect(),
            members,
            span: self.span,
        }
    }

    pub fn interface(&mut self, name: &str, members: Vec<FuncDecl>) -> InterfaceDecl {
        InterfaceDecl {
            id: self.node_id(),
            name: self.ident(name),
            members,
            span: self.span,
        }
    }

    pub fn ret(&mut self, value: Expr) -> Stmt {
        Stmt::Return(ReturnStmt {
            id: self.node_id(),
            value,
            span: self.span,
        })
    }

    pub fn print(&mut self, args: Vec<Expr>) -> Stmt {
        Stmt::Print(PrintStmt {
            id: self.node_id(),
            args,
            span: self.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_ids_are_unique() {
        let mut b = AstBuilder::new();
        let a = b.node_id();
        let c = b.node_id();
        assert_ne!(a, c);

        let x = b.var_ref("x");
        let y = b.var_ref("x");
        assert_ne!(x.id, y.id);
    }

    #[test]
    fn builder_interns_names() {
        let mut b = AstBuilder::new();
        let i = b.ident("foo");
        let j = b.ident("foo");
        assert_eq!(i.sym, j.sym);
        assert_eq!(b.interner.resolve(i.sym), "foo");
    }
}
