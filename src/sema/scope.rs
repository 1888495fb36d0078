// src/sema/scope.rs
//
// The scope stack. Two axes, mirroring how the passes use it:
//
// 1. A flat vector of every scope ever built. Class and interface scopes
//    stay addressable by owner name after they are closed lexically, which
//    is what field lookup and the inheritance walk rely on.
// 2. A stack of currently-active scope indices.
//
// Scopes are built once (pass 1) and re-entered by later passes; because
// every pass traverses the AST in the same order, `enter_scope` can simply
// advance a monotone cursor through the already-built vector.

use crate::frontend::Symbol;
use crate::sema::decl_table::DeclId;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Scope {
    entries: FxHashMap<Symbol, DeclId>,
    /// Superclass name, for class scopes of classes with `extends`
    parent_class: Option<Symbol>,
    /// Implemented interface names, in declaration order
    interfaces: Vec<Symbol>,
    /// Owning class/interface name, for member scopes
    owner: Option<Symbol>,
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    active: Vec<usize>,
    cur: usize,
    cursor: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            active: vec![0],
            cur: 0,
            cursor: 0,
        }
    }

    /// Return to the global scope and rewind the enter cursor. Called
    /// between passes; the built scopes are retained.
    pub fn reset(&mut self) {
        self.active.clear();
        self.active.push(0);
        self.cur = 0;
        self.cursor = 0;
    }

    /// Append a fresh scope and make it active.
    pub fn build_scope(&mut self) {
        self.cursor += 1;
        self.scopes.push(Scope::default());
        self.active.push(self.cursor);
        self.cur = self.cursor;
    }

    /// Append a fresh scope tagged with its owning class/interface name.
    pub fn build_scope_for(&mut self, owner: Symbol) {
        self.cursor += 1;
        self.scopes.push(Scope {
            owner: Some(owner),
            ..Scope::default()
        });
        self.active.push(self.cursor);
        self.cur = self.cursor;
    }

    /// Re-enter the next already-built scope. Later passes traverse the
    /// same shape as pass 1, so the cursor lines up with `build_scope`.
    pub fn enter_scope(&mut self) {
        self.cursor += 1;
        self.active.push(self.cursor);
        self.cur = self.cursor;
    }

    pub fn exit_scope(&mut self) {
        self.active.pop();
        self.cur = *self.active.last().expect("global scope never exits");
    }

    pub fn set_scope_parent(&mut self, parent: Symbol) {
        self.scopes[self.cur].parent_class = Some(parent);
    }

    pub fn add_interface(&mut self, interface: Symbol) {
        self.scopes[self.cur].interfaces.push(interface);
    }

    pub fn insert(&mut self, name: Symbol, decl: DeclId) {
        self.scopes[self.cur].entries.insert(name, decl);
    }

    /// Search only the current scope.
    pub fn local_lookup(&self, name: Symbol) -> Option<DeclId> {
        self.scopes[self.cur].entries.get(&name).copied()
    }

    fn find_scope_by_owner(&self, owner: Symbol) -> Option<usize> {
        self.scopes.iter().position(|s| s.owner == Some(owner))
    }

    /// Search a scope, then its parent-class chain. Stops if the chain
    /// loops back into the current scope.
    fn lookup_with_parents(&self, start: usize, name: Symbol) -> Option<DeclId> {
        let mut scope = &self.scopes[start];
        if let Some(&d) = scope.entries.get(&name) {
            return Some(d);
        }
        while let Some(parent) = scope.parent_class {
            let Some(idx) = self.find_scope_by_owner(parent) else {
                return None;
            };
            if idx == self.cur {
                return None;
            }
            scope = &self.scopes[idx];
            if let Some(&d) = scope.entries.get(&name) {
                return Some(d);
            }
        }
        None
    }

    /// Innermost-outward lookup over the active scopes; each scope's
    /// parent-class chain is consulted before moving outward.
    pub fn lookup(&self, name: Symbol) -> Option<DeclId> {
        self.active
            .iter()
            .rev()
            .find_map(|&idx| self.lookup_with_parents(idx, name))
    }

    /// Like `lookup`, but skips the current scope itself and only walks
    /// its parent-class chain.
    pub fn lookup_parent(&self, name: Symbol) -> Option<DeclId> {
        let mut scope = &self.scopes[self.cur];
        while let Some(parent) = scope.parent_class {
            let Some(idx) = self.find_scope_by_owner(parent) else {
                return None;
            };
            if idx == self.cur {
                return None;
            }
            scope = &self.scopes[idx];
            if let Some(&d) = scope.entries.get(&name) {
                return Some(d);
            }
        }
        None
    }

    /// Search the scopes of the current scope's implemented interfaces,
    /// in declaration order; first match wins.
    pub fn lookup_interface(&self, name: Symbol) -> Option<DeclId> {
        let interfaces = &self.scopes[self.cur].interfaces;
        interfaces.iter().find_map(|&itf| {
            let idx = self.find_scope_by_owner(itf)?;
            self.scopes[idx].entries.get(&name).copied()
        })
    }

    /// Locate the scope owned by `base`, search it, then walk its
    /// parent-class chain.
    pub fn lookup_field(&self, base: Symbol, field: Symbol) -> Option<DeclId> {
        let idx = self.find_scope_by_owner(base)?;
        self.lookup_with_parents(idx, field)
    }

    /// The declaration of the innermost enclosing class: find the closest
    /// active scope with an owner and resolve that owner name globally.
    pub fn lookup_this(&self) -> Option<DeclId> {
        self.active.iter().rev().find_map(|&idx| {
            let owner = self.scopes[idx].owner?;
            self.scopes[0].entries.get(&owner).copied()
        })
    }
}
