// src/codegen/layout.rs
//
// Memory layout planning, run only on an error-free analysis: global
// variable offsets, class instance and vtable layout with override
// collapsing, and decorated function labels. Frame-internal offsets
// (params, locals, temps) are assigned during emission.

use crate::codegen::location::{Location, Segment};
use crate::frontend::ast::{ClassDecl, Decl, Program};
use crate::frontend::Interner;
use crate::sema::analyzer::Analysis;
use crate::sema::decl_table::DeclId;
use rustc_hash::{FxHashMap, FxHashSet};

pub const VAR_SIZE: i32 = 4;
pub const OFFSET_TO_FIRST_LOCAL: i32 = -8;
pub const OFFSET_TO_FIRST_PARAM: i32 = 4;
pub const OFFSET_TO_FIRST_GLOBAL: i32 = 0;

#[derive(Debug, Default)]
pub struct Layout {
    /// Precomputed locations: globals (GP-relative) and class fields
    /// (FP-relative, base-tagged with the receiver)
    pub emit_loc: FxHashMap<DeclId, Location>,
    /// Decorated labels: `main`, `_function`, `_Class.method`
    pub label_of: FxHashMap<DeclId, String>,
    /// Byte offset of a method's slot within its class vtable; interface
    /// prototypes carry their declaration-position slot
    pub vtable_offset: FxHashMap<DeclId, i32>,
    pub instance_size: FxHashMap<DeclId, i32>,
    pub vtable_size: FxHashMap<DeclId, i32>,
    /// Per class: every reachable method, ancestors first, overrides
    /// collapsed into the ancestor's slot
    pub flattened_methods: FxHashMap<DeclId, Vec<DeclId>>,
}

pub fn plan(program: &Program, analysis: &Analysis, interner: &Interner) -> Layout {
    let mut layout = Layout::default();
    let mut global_offset = OFFSET_TO_FIRST_GLOBAL;

    for decl in &program.decls {
        match decl {
            Decl::Var(v) => {
                let Some(id) = analysis.decl(v.name.id) else { continue };
                let loc = Location::new(
                    Segment::GpRelative,
                    global_offset,
                    interner.resolve(v.name.sym),
                );
                global_offset += VAR_SIZE;
                layout.emit_loc.insert(id, loc);
            }
            Decl::Func(f) => {
                let Some(id) = analysis.decl(f.name.id) else { continue };
                let name = interner.resolve(f.name.sym);
                let label = if name == "main" {
                    name.to_string()
                } else {
                    format!("_{}", name)
                };
                layout.label_of.insert(id, label);
            }
            Decl::Class(c) => plan_class(c, analysis, interner, &mut layout),
            Decl::Interface(i) => {
                for (slot, proto) in i.members.iter().enumerate() {
                    if let Some(id) = analysis.decl(proto.name.id) {
                        layout.vtable_offset.insert(id, slot as i32 * VAR_SIZE);
                    }
                }
            }
        }
    }

    layout
}

fn plan_class(c: &ClassDecl, analysis: &Analysis, interner: &Interner, layout: &mut Layout) {
    let Some(class_id) = analysis.decl(c.name.id) else { return };
    let decls = &analysis.decls;

    // Flatten the member lists root-first up the superclass chain
    let mut vars: Vec<DeclId> = Vec::new();
    let mut methods: Vec<DeclId> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut cur = Some(c.name.sym);
    while let Some(name) = cur {
        if !seen.insert(name) {
            break;
        }
        let Some(class) = decls.class_by_name(name) else { break };
        let level_vars: Vec<DeclId> = class
            .members
            .iter()
            .copied()
            .filter(|&m| decls.is_var(m))
            .collect();
        let level_methods: Vec<DeclId> = class
            .members
            .iter()
            .copied()
            .filter(|&m| decls.is_func(m))
            .collect();
        vars.splice(0..0, level_vars);
        methods.splice(0..0, level_methods);
        cur = class.extends;
    }

    // Collapse overrides: a later (subclass) method with the same name
    // replaces the inherited slot in place, and its own trailing entry
    // is removed; each name ends up exactly once, position preserved.
    let mut i = 0;
    while i < methods.len() {
        let mut j = i + 1;
        while j < methods.len() {
            if decls.name_of(methods[j]) == decls.name_of(methods[i]) {
                methods[i] = methods[j];
                methods.remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }

    let instance_size = vars.len() as i32 * VAR_SIZE + VAR_SIZE;
    let vtable_size = methods.len() as i32 * VAR_SIZE;

    // Own variables fill the instance tail, descending in reverse
    // declaration order; inherited variables keep the offsets assigned by
    // their declaring class.
    let mut var_offset = instance_size;
    for member in c.members.iter().rev() {
        let Decl::Var(v) = member else { continue };
        let Some(member_id) = analysis.decl(v.name.id) else { continue };
        var_offset -= VAR_SIZE;
        layout.emit_loc.insert(
            member_id,
            Location::with_base(
                Segment::FpRelative,
                var_offset,
                interner.resolve(v.name.sym),
                Location::this(),
            ),
        );
    }

    for member in &c.members {
        let Decl::Func(f) = member else { continue };
        let Some(member_id) = analysis.decl(f.name.id) else { continue };
        layout.label_of.insert(
            member_id,
            format!(
                "_{}.{}",
                interner.resolve(c.name.sym),
                interner.resolve(f.name.sym)
            ),
        );
        if let Some(slot) = methods
            .iter()
            .position(|&m| decls.name_of(m) == f.name.sym)
        {
            layout.vtable_offset.insert(member_id, slot as i32 * VAR_SIZE);
        }
    }

    layout.instance_size.insert(class_id, instance_size);
    layout.vtable_size.insert(class_id, vtable_size);
    layout.flattened_methods.insert(class_id, methods);
}
