// src/sema/decl_table.rs
//
// Arena of bound declarations. The binder allocates a DeclId per declaration
// site; identifier use sites resolve to DeclIds through the scope stack, and
// every later phase (inheritance checks, typing, layout, emission) reads
// declaration facts from here.

use crate::frontend::{NodeId, Symbol};
use crate::sema::types::Ty;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Stable index of a bound declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// SmallVec for implements lists - most classes implement 0-2 interfaces
pub type ImplementsVec = SmallVec<[Symbol; 2]>;

/// Validation state of a declaration's annotated type. A declaration's
/// type is usable only once the binder has checked it; uses of a
/// declaration whose type failed validation sink without further errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TyState {
    #[default]
    Unchecked,
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
pub enum DeclData {
    Var(VarData),
    Func(FuncData),
    Class(ClassData),
    Interface(InterfaceData),
}

#[derive(Debug, Clone)]
pub struct VarData {
    pub name: Symbol,
    pub ty: Ty,
    pub state: TyState,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct FuncData {
    pub name: Symbol,
    pub ret: Ty,
    pub ret_state: TyState,
    pub formals: Vec<DeclId>,
    pub has_body: bool,
    /// Enclosing class or interface name; None for free functions
    pub owner: Option<Symbol>,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: Symbol,
    pub extends: Option<Symbol>,
    pub implements: ImplementsVec,
    pub members: Vec<DeclId>,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct InterfaceData {
    pub name: Symbol,
    pub members: Vec<DeclId>,
    pub node: NodeId,
}

#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<DeclData>,
    /// Top-level classes and interfaces by name
    types: FxHashMap<Symbol, DeclId>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, data: DeclData) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        if let DeclData::Class(c) = &data {
            self.types.insert(c.name, id);
        } else if let DeclData::Interface(i) = &data {
            self.types.insert(i.name, id);
        }
        self.decls.push(data);
        id
    }

    pub fn get(&self, id: DeclId) -> &DeclData {
        &self.decls[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut DeclData {
        &mut self.decls[id.0 as usize]
    }

    pub fn name_of(&self, id: DeclId) -> Symbol {
        match self.get(id) {
            DeclData::Var(d) => d.name,
            DeclData::Func(d) => d.name,
            DeclData::Class(d) => d.name,
            DeclData::Interface(d) => d.name,
        }
    }

    pub fn as_var(&self, id: DeclId) -> Option<&VarData> {
        match self.get(id) {
            DeclData::Var(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_func(&self, id: DeclId) -> Option<&FuncData> {
        match self.get(id) {
            DeclData::Func(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_class(&self, id: DeclId) -> Option<&ClassData> {
        match self.get(id) {
            DeclData::Class(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_interface(&self, id: DeclId) -> Option<&InterfaceData> {
        match self.get(id) {
            DeclData::Interface(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_var(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclData::Var(_))
    }

    pub fn is_func(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclData::Func(_))
    }

    pub fn is_class(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclData::Class(_))
    }

    pub fn is_interface(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclData::Interface(_))
    }

    /// Top-level class or interface declaration by name
    pub fn type_decl(&self, name: Symbol) -> Option<DeclId> {
        self.types.get(&name).copied()
    }

    pub fn class_by_name(&self, name: Symbol) -> Option<&ClassData> {
        self.type_decl(name).and_then(|id| self.as_class(id))
    }

    /// Is the class named `class_name` the same as, a subclass of, or an
    /// implementer of the class/interface declaration `other`? Walks the
    /// extends chain, consulting the implements list at every level.
    pub fn is_child_of(&self, class_name: Symbol, other: DeclId) -> bool {
        match self.get(other) {
            DeclData::Class(target) => {
                let mut cur = Some(class_name);
                while let Some(name) = cur {
                    if name == target.name {
                        return true;
                    }
                    cur = self.class_by_name(name).and_then(|c| c.extends);
                }
                false
            }
            DeclData::Interface(target) => {
                let mut cur = Some(class_name);
                while let Some(name) = cur {
                    let Some(class) = self.class_by_name(name) else {
                        return false;
                    };
                    if class.implements.contains(&target.name) {
                        return true;
                    }
                    cur = class.extends;
                }
                false
            }
            _ => false,
        }
    }

    /// A variable's semantic type, available once its annotation validated.
    pub fn var_ty(&self, id: DeclId) -> Option<Ty> {
        let v = self.as_var(id)?;
        (v.state == TyState::Valid).then(|| v.ty.clone())
    }

    /// A function's return type, available once its annotation validated.
    pub fn func_ret_ty(&self, id: DeclId) -> Option<Ty> {
        let f = self.as_func(id)?;
        (f.ret_state == TyState::Valid).then(|| f.ret.clone())
    }

    /// Exact signature match: equivalent return type, same arity, pairwise
    /// equivalent formal types. Used for override and interface checking.
    pub fn signatures_equivalent(&self, a: DeclId, b: DeclId) -> bool {
        let (Some(fa), Some(fb)) = (self.as_func(a), self.as_func(b)) else {
            return false;
        };
        if fa.ret != fb.ret {
            return false;
        }
        if fa.formals.len() != fb.formals.len() {
            return false;
        }
        fa.formals.iter().zip(fb.formals.iter()).all(|(&x, &y)| {
            match (self.as_var(x), self.as_var(y)) {
                (Some(vx), Some(vy)) => vx.ty == vy.ty,
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Interner;

    fn class(table: &mut DeclTable, name: Symbol, extends: Option<Symbol>) -> DeclId {
        table.alloc(DeclData::Class(ClassData {
            name,
            extends,
            implements: ImplementsVec::new(),
            members: Vec::new(),
            node: NodeId(0),
        }))
    }

    #[test]
    fn child_of_walks_extends_chain() {
        let mut interner = Interner::new();
        let (a, b, c) = (
            interner.intern("A"),
            interner.intern("B"),
            interner.intern("C"),
        );
        let mut table = DeclTable::new();
        let a_id = class(&mut table, a, None);
        let _b_id = class(&mut table, b, Some(a));
        let c_id = class(&mut table, c, Some(b));

        assert!(table.is_child_of(c, a_id));
        assert!(table.is_child_of(b, a_id));
        assert!(table.is_child_of(a, a_id), "a class is a child of itself");
        assert!(!table.is_child_of(a, c_id));
    }

    #[test]
    fn child_of_sees_interfaces_up_the_chain() {
        let mut interner = Interner::new();
        let (i, a, b) = (
            interner.intern("I"),
            interner.intern("A"),
            interner.intern("B"),
        );
        let mut table = DeclTable::new();
        let i_id = table.alloc(DeclData::Interface(InterfaceData {
            name: i,
            members: Vec::new(),
            node: NodeId(0),
        }));
        table.alloc(DeclData::Class(ClassData {
            name: a,
            extends: None,
            implements: ImplementsVec::from_slice(&[i]),
            members: Vec::new(),
            node: NodeId(0),
        }));
        class(&mut table, b, Some(a));

        assert!(table.is_child_of(a, i_id));
        assert!(table.is_child_of(b, i_id), "inherited implements counts");
    }

    #[test]
    fn signature_equivalence() {
        let mut interner = Interner::new();
        let f = interner.intern("f");
        let x = interner.intern("x");
        let mut table = DeclTable::new();

        let p1 = table.alloc(DeclData::Var(VarData {
            name: x,
            ty: Ty::Int,
            state: TyState::Valid,
            node: NodeId(0),
        }));
        let p2 = table.alloc(DeclData::Var(VarData {
            name: x,
            ty: Ty::Int,
            state: TyState::Valid,
            node: NodeId(0),
        }));
        let p3 = table.alloc(DeclData::Var(VarData {
            name: x,
            ty: Ty::Bool,
            state: TyState::Valid,
            node: NodeId(0),
        }));

        let mk = |table: &mut DeclTable, ret: Ty, formals: Vec<DeclId>| {
            table.alloc(DeclData::Func(FuncData {
                name: f,
                ret,
                ret_state: TyState::Valid,
                formals,
                has_body: true,
                owner: None,
                node: NodeId(0),
            }))
        };

        let f1 = mk(&mut table, Ty::Int, vec![p1]);
        let f2 = mk(&mut table, Ty::Int, vec![p2]);
        let f3 = mk(&mut table, Ty::Int, vec![p3]);
        let f4 = mk(&mut table, Ty::Void, vec![]);

        assert!(table.signatures_equivalent(f1, f2));
        assert!(!table.signatures_equivalent(f1, f3), "formal type differs");
        assert!(!table.signatures_equivalent(f1, f4), "arity differs");
    }
}
