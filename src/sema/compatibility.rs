// src/sema/compatibility.rs
//
// Type equivalence and assignment-compatibility checking. Equivalence is
// pure; compatibility needs the declaration table to walk the class graph.

use crate::sema::decl_table::DeclTable;
use crate::sema::types::Ty;

/// Structural type equivalence: basics by kind, named types by name,
/// arrays by element equivalence.
pub fn equivalent(a: &Ty, b: &Ty) -> bool {
    a == b
}

/// `target.is_compatible_with(source)`: can a value of type `source` be
/// bound where `target` is expected?
///
/// - identical types are always compatible
/// - `null` is assignable to any class/interface type, and to an array
///   type whose element type accepts `null`
/// - a class is assignable to any transitive superclass and to any
///   interface it (or an ancestor) implements
/// - `error` on either side is compatible, so unresolved subtrees do not
///   cascade further diagnostics
pub fn compatible(target: &Ty, source: &Ty, decls: &DeclTable) -> bool {
    if matches!(target, Ty::Error) || matches!(source, Ty::Error) {
        return true;
    }

    match target {
        Ty::Named(name) => match source {
            Ty::Null => true,
            Ty::Named(src_name) => {
                if name == src_name {
                    return true;
                }
                let Some(target_decl) = decls.type_decl(*name) else {
                    return false;
                };
                // Only a class can be on the source side of a widening
                if decls.class_by_name(*src_name).is_none() {
                    return false;
                }
                decls.is_child_of(*src_name, target_decl)
            }
            _ => false,
        },
        Ty::Array(elem) => match source {
            Ty::Null => compatible(elem, &Ty::Null, decls),
            _ => equivalent(target, source),
        },
        _ => equivalent(target, source),
    }
}
