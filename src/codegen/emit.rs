// src/codegen/emit.rs
//
// Post-order TAC generation. Runs only on an error-free analysis, so every
// identifier is resolved, every expression is typed, and nothing
// double-typed remains.
//
// Every expression evaluation yields a Value: a location, possibly
// base-tagged (field access) or holding an element address (array access).
// Reading through either emits the load at the point of use, which keeps
// each instruction self-contained for the naive lowering.

use crate::codegen::layout::{
    Layout, OFFSET_TO_FIRST_LOCAL, OFFSET_TO_FIRST_PARAM, VAR_SIZE,
};
use crate::codegen::location::{Location, Segment};
use crate::codegen::tac::{Instr, TacOp};
use crate::frontend::ast::*;
use crate::frontend::Interner;
use crate::sema::analyzer::Analysis;
use crate::sema::decl_table::DeclId;
use crate::sema::types::Ty;
use rustc_hash::FxHashMap;

const INDEX_OUT_OF_BOUND: &str = "subscript out of bound\\n";
const ARRAY_SIZE_NOT_POSITIVE: &str = "Array size is <= 0\\n";

/// Result of emitting an expression. `array_ref` marks a location that
/// holds the *address* of an array element rather than a value.
#[derive(Debug, Clone)]
struct Value {
    loc: Location,
    array_ref: bool,
}

impl Value {
    fn direct(loc: Location) -> Self {
        Self {
            loc,
            array_ref: false,
        }
    }

    fn element(loc: Location) -> Self {
        Self {
            loc,
            array_ref: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Builtin {
    Alloc,
    ReadLine,
    ReadInteger,
    StringEqual,
    PrintInt,
    PrintString,
    PrintBool,
    Halt,
}

impl Builtin {
    /// (label, declared argument count, has return value)
    fn spec(self) -> (&'static str, i32, bool) {
        match self {
            Builtin::Alloc => ("_Alloc", 1, true),
            Builtin::ReadLine => ("_ReadLine", 0, true),
            Builtin::ReadInteger => ("_ReadInteger", 0, true),
            Builtin::StringEqual => ("_StringEqual", 2, true),
            Builtin::PrintInt => ("_PrintInt", 1, false),
            Builtin::PrintString => ("_PrintString", 1, false),
            Builtin::PrintBool => ("_PrintBool", 1, false),
            Builtin::Halt => ("_Halt", 0, false),
        }
    }
}

pub struct CodeGen<'a> {
    analysis: &'a Analysis,
    layout: &'a Layout,
    interner: &'a Interner,
    code: Vec<Instr>,
    label_count: u32,
    temp_count: u32,
    local_offset: i32,
    param_offset: i32,
    emit_locs: FxHashMap<DeclId, Location>,
    break_targets: Vec<String>,
}

impl<'a> CodeGen<'a> {
    pub fn emit_program(
        program: &Program,
        analysis: &'a Analysis,
        layout: &'a Layout,
        interner: &'a Interner,
    ) -> Vec<Instr> {
        let mut cg = CodeGen {
            analysis,
            layout,
            interner,
            code: Vec::new(),
            label_count: 0,
            temp_count: 0,
            local_offset: OFFSET_TO_FIRST_LOCAL,
            param_offset: OFFSET_TO_FIRST_PARAM,
            emit_locs: layout.emit_loc.clone(),
            break_targets: Vec::new(),
        };

        for decl in &program.decls {
            match decl {
                // Globals were placed by the layout planner; interfaces
                // contribute no code and no vtable
                Decl::Var(_) | Decl::Interface(_) => {}
                Decl::Func(f) => cg.emit_function(f),
                Decl::Class(c) => cg.emit_class(c),
            }
        }

        cg.code
    }

    // ---- instruction constructors -------------------------------------

    fn new_label(&mut self) -> String {
        let label = format!("_L{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn next_local(&mut self) -> i32 {
        let n = self.local_offset;
        self.local_offset -= VAR_SIZE;
        n
    }

    fn next_param(&mut self) -> i32 {
        let n = self.param_offset;
        self.param_offset += VAR_SIZE;
        n
    }

    fn reset_frame(&mut self) {
        self.local_offset = OFFSET_TO_FIRST_LOCAL;
        self.param_offset = OFFSET_TO_FIRST_PARAM;
    }

    fn frame_size(&self) -> i32 {
        OFFSET_TO_FIRST_LOCAL - self.local_offset
    }

    fn new_temp(&mut self) -> Location {
        let name = format!("_tmp{}", self.temp_count);
        self.temp_count += 1;
        let offset = self.next_local();
        Location::new(Segment::FpRelative, offset, name)
    }

    fn gen_load_const(&mut self, value: i32) -> Location {
        let dst = self.new_temp();
        self.code.push(Instr::LoadConst {
            dst: dst.clone(),
            value,
        });
        dst
    }

    fn gen_load_string(&mut self, value: &str) -> Location {
        let quoted = if value.starts_with('"') {
            value.to_string()
        } else {
            format!("\"{}\"", value)
        };
        let dst = self.new_temp();
        self.code.push(Instr::LoadString {
            dst: dst.clone(),
            value: quoted,
        });
        dst
    }

    fn gen_load_label(&mut self, label: &str) -> Location {
        let dst = self.new_temp();
        self.code.push(Instr::LoadLabel {
            dst: dst.clone(),
            label: label.to_string(),
        });
        dst
    }

    fn gen_assign(&mut self, dst: Location, src: Location) {
        self.code.push(Instr::Assign { dst, src });
    }

    fn gen_load(&mut self, src: Location, offset: i32) -> Location {
        let dst = self.new_temp();
        self.code.push(Instr::Load {
            dst: dst.clone(),
            src,
            offset,
        });
        dst
    }

    fn gen_store(&mut self, dst: Location, src: Location, offset: i32) {
        self.code.push(Instr::Store { dst, src, offset });
    }

    fn gen_binary(&mut self, op: TacOp, lhs: Location, rhs: Location) -> Location {
        let dst = self.new_temp();
        self.code.push(Instr::Binary {
            op,
            dst: dst.clone(),
            lhs,
            rhs,
        });
        dst
    }

    fn gen_label(&mut self, name: &str) {
        self.code.push(Instr::Label {
            name: name.to_string(),
        });
    }

    fn gen_goto(&mut self, label: &str) {
        self.code.push(Instr::Goto {
            label: label.to_string(),
        });
    }

    fn gen_ifz(&mut self, test: Location, label: &str) {
        self.code.push(Instr::IfZ {
            test,
            label: label.to_string(),
        });
    }

    fn gen_begin_func(&mut self) -> usize {
        self.reset_frame();
        let idx = self.code.len();
        self.code.push(Instr::BeginFunc { frame_size: 0 });
        idx
    }

    fn gen_return(&mut self, value: Option<Location>) {
        self.code.push(Instr::Return { value });
    }

    fn gen_push_param(&mut self, param: Location) {
        self.code.push(Instr::PushParam { param });
    }

    fn gen_pop_params(&mut self, bytes: i32) {
        if bytes > 0 {
            self.code.push(Instr::PopParams { bytes });
        }
    }

    fn gen_lcall(&mut self, label: &str, has_return: bool) -> Option<Location> {
        let dst = has_return.then(|| self.new_temp());
        self.code.push(Instr::LCall {
            label: label.to_string(),
            dst: dst.clone(),
        });
        dst
    }

    fn gen_acall(&mut self, addr: Location, has_return: bool) -> Option<Location> {
        let dst = has_return.then(|| self.new_temp());
        self.code.push(Instr::ACall {
            addr,
            dst: dst.clone(),
        });
        dst
    }

    /// Arguments are pushed second-first; the pop uses the builtin's
    /// declared argument count.
    fn gen_builtin(
        &mut self,
        builtin: Builtin,
        arg1: Option<Location>,
        arg2: Option<Location>,
    ) -> Option<Location> {
        let (label, num_args, has_return) = builtin.spec();
        let result = has_return.then(|| self.new_temp());
        if let Some(arg2) = arg2 {
            self.gen_push_param(arg2);
        }
        if let Some(arg1) = arg1 {
            self.gen_push_param(arg1);
        }
        self.code.push(Instr::LCall {
            label: label.to_string(),
            dst: result.clone(),
        });
        self.gen_pop_params(VAR_SIZE * num_args);
        result
    }

    // ---- values --------------------------------------------------------

    /// Read a value: base-tagged locations load through their base,
    /// element references load through the element address.
    fn deref(&mut self, value: &Value) -> Location {
        if let Some(base) = &value.loc.base {
            let base = (**base).clone();
            self.gen_load(base, value.loc.offset)
        } else if value.array_ref {
            self.gen_load(value.loc.clone(), 0)
        } else {
            value.loc.clone()
        }
    }

    /// The write-back discipline shared by assignment and postfix ops.
    fn store_into(&mut self, target: &Value, value: Location) {
        if let Some(base) = &target.loc.base {
            let base = (**base).clone();
            self.gen_store(base, value, target.loc.offset);
        } else if target.array_ref {
            self.gen_store(target.loc.clone(), value, 0);
        } else {
            self.gen_assign(target.loc.clone(), value);
        }
    }

    // ---- declarations --------------------------------------------------

    fn emit_class(&mut self, c: &ClassDecl) {
        for member in &c.members {
            if let Decl::Func(f) = member {
                self.emit_function(f);
            }
        }

        let Some(class_id) = self.analysis.decl(c.name.id) else {
            return;
        };
        let methods: Vec<String> = self
            .layout
            .flattened_methods
            .get(&class_id)
            .map(|ms| {
                ms.iter()
                    .filter_map(|m| self.layout.label_of.get(m).cloned())
                    .collect()
            })
            .unwrap_or_default();
        self.code.push(Instr::VTable {
            label: self.interner.resolve(c.name.sym).to_string(),
            methods,
        });
    }

    fn emit_function(&mut self, f: &FuncDecl) {
        let Some(decl_id) = self.analysis.decl(f.name.id) else {
            return;
        };
        let Some(func) = self.analysis.decls.as_func(decl_id) else {
            return;
        };
        let is_method = func.owner.is_some();

        let Some(label) = self.layout.label_of.get(&decl_id).cloned() else {
            return;
        };
        self.gen_label(&label);
        let begin = self.gen_begin_func();

        if is_method {
            // Receiver occupies the first parameter slot
            self.next_param();
        }
        for formal in &f.formals {
            let Some(formal_id) = self.analysis.decl(formal.name.id) else {
                continue;
            };
            let offset = self.next_param();
            self.emit_locs.insert(
                formal_id,
                Location::new(
                    Segment::FpRelative,
                    offset,
                    self.interner.resolve(formal.name.sym),
                ),
            );
        }

        if let Some(body) = &f.body {
            self.emit_block(body);
        }

        let size = self.frame_size();
        if let Instr::BeginFunc { frame_size } = &mut self.code[begin] {
            *frame_size = size;
        }
        self.code.push(Instr::EndFunc);
    }

    fn emit_block(&mut self, block: &Block) {
        for decl in &block.decls {
            self.emit_var_decl(decl);
        }
        for stmt in &block.stmts {
            self.emit_stmt(stmt);
        }
    }

    fn emit_var_decl(&mut self, v: &VarDecl) {
        let Some(decl_id) = self.analysis.decl(v.name.id) else {
            return;
        };
        // Globals and fields were placed by the layout planner
        if !self.emit_locs.contains_key(&decl_id) {
            let offset = self.next_local();
            self.emit_locs.insert(
                decl_id,
                Location::new(
                    Segment::FpRelative,
                    offset,
                    self.interner.resolve(v.name.sym),
                ),
            );
        }
    }

    // ---- statements ----------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.emit_block(b),
            Stmt::If(s) => self.emit_if(s),
            Stmt::While(s) => self.emit_while(s),
            Stmt::For(s) => self.emit_for(s),
            Stmt::Switch(s) => self.emit_switch(s),
            Stmt::Break(_) => {
                if let Some(target) = self.break_targets.last().cloned() {
                    self.gen_goto(&target);
                }
            }
            Stmt::Return(s) => {
                if s.value.is_empty_expr() {
                    self.gen_return(None);
                } else if let Some(v) = self.emit_expr(&s.value) {
                    let loc = self.deref(&v);
                    self.gen_return(Some(loc));
                }
            }
            Stmt::Print(s) => self.emit_print(s),
            Stmt::Expr(e) => {
                self.emit_expr(e);
            }
        }
    }

    fn emit_if(&mut self, s: &IfStmt) {
        let test = self.emit_expr(&s.test);
        let else_label = self.new_label();
        if let Some(test) = test {
            let t = self.deref(&test);
            self.gen_ifz(t, &else_label);
        }
        self.emit_stmt(&s.then_body);
        let end_label = self.new_label();
        self.gen_goto(&end_label);
        self.gen_label(&else_label);
        if let Some(else_body) = &s.else_body {
            self.emit_stmt(else_body);
        }
        self.gen_label(&end_label);
    }

    fn emit_while(&mut self, s: &WhileStmt) {
        let top = self.new_label();
        self.gen_label(&top);
        let test = self.emit_expr(&s.test);
        let end = self.new_label();
        if let Some(test) = test {
            let t = self.deref(&test);
            self.gen_ifz(t, &end);
        }
        self.break_targets.push(end.clone());
        self.emit_stmt(&s.body);
        self.break_targets.pop();
        self.gen_goto(&top);
        self.gen_label(&end);
    }

    fn emit_for(&mut self, s: &ForStmt) {
        self.emit_expr(&s.init);
        let top = self.new_label();
        self.gen_label(&top);
        let test = self.emit_expr(&s.test);
        let end = self.new_label();
        if let Some(test) = test {
            let t = self.deref(&test);
            self.gen_ifz(t, &end);
        }
        self.break_targets.push(end.clone());
        self.emit_stmt(&s.body);
        self.break_targets.pop();
        self.emit_expr(&s.step);
        self.gen_goto(&top);
        self.gen_label(&end);
    }

    /// Comparison chain in source order; a valueless `default` case is an
    /// unconditional branch, so any case after it is unreachable.
    fn emit_switch(&mut self, s: &SwitchStmt) {
        let subject = self.emit_expr(&s.subject);
        let end = self.new_label();
        let Some(subject) = subject else { return };
        let switch_value = self.deref(&subject);

        let mut case_labels = Vec::with_capacity(s.cases.len());
        for case in &s.cases {
            let case_label = self.new_label();
            match &case.value {
                Some(value) => {
                    if let Some(v) = self.emit_expr(value) {
                        let cv = self.deref(&v);
                        let t = self.gen_binary(TacOp::Ne, switch_value.clone(), cv);
                        self.gen_ifz(t, &case_label);
                    }
                }
                None => self.gen_goto(&case_label),
            }
            case_labels.push(case_label);
        }

        self.break_targets.push(end.clone());
        for (case, label) in s.cases.iter().zip(&case_labels) {
            self.gen_label(label);
            for stmt in &case.stmts {
                self.emit_stmt(stmt);
            }
        }
        self.break_targets.pop();

        self.gen_label(&end);
    }

    fn emit_print(&mut self, s: &PrintStmt) {
        for arg in &s.args {
            let Some(v) = self.emit_expr(arg) else { continue };
            let builtin = match self.analysis.ty(arg.id) {
                Some(&Ty::Int) => Builtin::PrintInt,
                Some(&Ty::String) => Builtin::PrintString,
                _ => Builtin::PrintBool,
            };
            let loc = self.deref(&v);
            self.gen_builtin(builtin, Some(loc), None);
        }
        let newline = self.gen_load_string("\\n");
        self.gen_builtin(Builtin::PrintString, Some(newline), None);
    }

    // ---- expressions ---------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr) -> Option<Value> {
        match &expr.kind {
            ExprKind::Empty => None,

            ExprKind::IntLit(v) => Some(Value::direct(self.gen_load_const(*v))),
            ExprKind::BoolLit(v) => {
                Some(Value::direct(self.gen_load_const(if *v { 1 } else { 0 })))
            }
            ExprKind::StringLit(s) => {
                let s = s.clone();
                Some(Value::direct(self.gen_load_string(&s)))
            }
            ExprKind::NullLit => Some(Value::direct(self.gen_load_const(0))),
            // Doubles never survive analysis
            ExprKind::DoubleLit(_) => None,

            ExprKind::This => Some(Value::direct(Location::this())),

            ExprKind::Field { base: None, field } => {
                let decl = self.analysis.decl(field.id)?;
                let loc = self.emit_locs.get(&decl)?.clone();
                Some(Value::direct(loc))
            }

            ExprKind::Field {
                base: Some(base),
                field,
            } => {
                let base_val = self.emit_expr(base)?;
                let decl = self.analysis.decl(field.id)?;
                let field_loc = self.emit_locs.get(&decl)?.clone();
                let base_loc = self.deref(&base_val);
                Some(Value::direct(Location::with_base(
                    Segment::FpRelative,
                    field_loc.offset,
                    field_loc.name,
                    base_loc,
                )))
            }

            ExprKind::Call { base, method, args } => {
                self.emit_call(base.as_deref(), method, args)
            }

            ExprKind::ArrayAccess { base, subscript } => self.emit_array_access(base, subscript),

            ExprKind::Unary { op, operand } => {
                let operand_val = self.emit_expr(operand)?;
                let zero = self.gen_load_const(0);
                let r = self.deref(&operand_val);
                let op = match op {
                    UnOp::Neg => TacOp::Sub,
                    UnOp::Not => TacOp::Eq,
                };
                Some(Value::direct(self.gen_binary(op, zero, r)))
            }

            ExprKind::Binary { op, left, right } => self.emit_binary(*op, left, right),

            ExprKind::Assign { target, value } => {
                let value_val = self.emit_expr(value)?;
                let target_val = self.emit_expr(target)?;
                let r = self.deref(&value_val);
                self.store_into(&target_val, r);
                let result = self.deref(&target_val);
                Some(Value::direct(result))
            }

            ExprKind::Postfix { op, target } => {
                let target_val = self.emit_expr(target)?;
                let current = self.deref(&target_val);

                // The expression's result is the value before the update
                let saved = self.new_temp();
                self.gen_assign(saved.clone(), current.clone());

                let one = self.gen_load_const(1);
                let op = match op {
                    PostOp::Inc => TacOp::Add,
                    PostOp::Dec => TacOp::Sub,
                };
                let updated = self.gen_binary(op, current, one);
                self.store_into(&target_val, updated);
                Some(Value::direct(saved))
            }

            ExprKind::New { class } => {
                let decl = self.analysis.decl(class.id)?;
                let size = *self.layout.instance_size.get(&decl)?;
                let size_loc = self.gen_load_const(size);
                let object = self.gen_builtin(Builtin::Alloc, Some(size_loc), None)?;
                let vtable = self.gen_load_label(self.interner.resolve(class.sym));
                self.gen_store(object.clone(), vtable, 0);
                Some(Value::direct(object))
            }

            ExprKind::NewArray { size, .. } => {
                let size_val = self.emit_expr(size)?;
                let n = self.deref(&size_val);
                let zero = self.gen_load_const(0);
                let bad = self.gen_binary(TacOp::Le, n.clone(), zero);
                let ok = self.new_label();
                self.gen_ifz(bad, &ok);
                let message = self.gen_load_string(ARRAY_SIZE_NOT_POSITIVE);
                self.gen_builtin(Builtin::PrintString, Some(message), None);
                self.gen_builtin(Builtin::Halt, None, None);
                self.gen_label(&ok);

                // One extra leading word holds the length
                let one = self.gen_load_const(1);
                let count = self.gen_binary(TacOp::Add, one, n.clone());
                let elem_size = self.gen_load_const(VAR_SIZE);
                let bytes = self.gen_binary(TacOp::Mul, count, elem_size.clone());
                let array = self.gen_builtin(Builtin::Alloc, Some(bytes), None)?;
                self.gen_store(array.clone(), n, 0);
                let first = self.gen_binary(TacOp::Add, array, elem_size);
                Some(Value::direct(first))
            }

            ExprKind::ReadInteger => self
                .gen_builtin(Builtin::ReadInteger, None, None)
                .map(Value::direct),
            ExprKind::ReadLine => self
                .gen_builtin(Builtin::ReadLine, None, None)
                .map(Value::direct),
        }
    }

    fn emit_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Option<Value> {
        let left_val = self.emit_expr(left)?;
        let right_val = self.emit_expr(right)?;

        // String equality goes through the runtime comparison
        if op.kind() == BinOpKind::Equality
            && self.analysis.ty(left.id) == Some(&Ty::String)
            && self.analysis.ty(right.id) == Some(&Ty::String)
        {
            let l = self.deref(&left_val);
            let r = self.deref(&right_val);
            let mut result = self.gen_builtin(Builtin::StringEqual, Some(l), Some(r))?;
            if op == BinOp::Ne {
                let zero = self.gen_load_const(0);
                result = self.gen_binary(TacOp::Eq, zero, result);
            }
            return Some(Value::direct(result));
        }

        let tac_op = TacOp::from_symbol(op.symbol())?;
        let l = self.deref(&left_val);
        let r = self.deref(&right_val);
        Some(Value::direct(self.gen_binary(tac_op, l, r)))
    }

    /// Subscript check, abort on failure, then element address:
    /// `base + subscript * elem_size`.
    fn emit_array_access(&mut self, base: &Expr, subscript: &Expr) -> Option<Value> {
        let base_val = self.emit_expr(base)?;
        let sub_val = self.emit_expr(subscript)?;

        let index = self.deref(&sub_val);
        let zero = self.gen_load_const(0);
        let negative = self.gen_binary(TacOp::Lt, index.clone(), zero.clone());
        let array = self.deref(&base_val);
        let length = self.gen_load(array.clone(), -VAR_SIZE);
        let in_range = self.gen_binary(TacOp::Lt, index.clone(), length);
        let too_big = self.gen_binary(TacOp::Eq, in_range, zero);
        let out_of_bounds = self.gen_binary(TacOp::Or, negative, too_big);
        let ok = self.new_label();
        self.gen_ifz(out_of_bounds, &ok);
        let message = self.gen_load_string(INDEX_OUT_OF_BOUND);
        self.gen_builtin(Builtin::PrintString, Some(message), None);
        self.gen_builtin(Builtin::Halt, None, None);
        self.gen_label(&ok);

        let elem_size = self.gen_load_const(VAR_SIZE);
        let byte_offset = self.gen_binary(TacOp::Mul, elem_size, index);
        let address = self.gen_binary(TacOp::Add, array, byte_offset);
        Some(Value::element(address))
    }

    fn emit_call(&mut self, base: Option<&Expr>, method: &Ident, args: &[Expr]) -> Option<Value> {
        let base_val = match base {
            Some(b) => Some(self.emit_expr(b)?),
            None => None,
        };
        let arg_vals: Vec<Value> = args.iter().filter_map(|a| self.emit_expr(a)).collect();

        // array.length() reads the hidden length word
        if let (Some(b), Some(bv)) = (base, &base_val) {
            if self.analysis.ty(b.id).is_some_and(Ty::is_array)
                && self.interner.resolve(method.sym) == "length"
            {
                let array = self.deref(bv);
                let length = self.gen_load(array, -VAR_SIZE);
                return Some(Value::direct(length));
            }
        }

        let fn_decl = self.analysis.decl(method.id)?;
        let func = self.analysis.decls.as_func(fn_decl)?;
        let has_return = func.ret != Ty::Void;
        let is_member = func.owner.is_some();
        let is_acall = base.is_some() || is_member;

        let this_loc = match (&base_val, is_member) {
            (Some(bv), _) => Some(self.deref(bv)),
            (None, true) => Some(Location::this()),
            (None, false) => None,
        };

        // Method pointer: word 0 of the receiver is the vtable
        let method_ptr = if is_acall {
            let receiver = this_loc.clone()?;
            let vtable = self.gen_load(receiver, 0);
            let offset = self.layout.vtable_offset.get(&fn_decl).copied()?;
            Some(self.gen_load(vtable, offset))
        } else {
            None
        };

        for v in arg_vals.iter().rev() {
            let loc = self.deref(v);
            self.gen_push_param(loc);
        }

        if is_acall {
            self.gen_push_param(this_loc?);
            let result = self.gen_acall(method_ptr?, has_return);
            self.gen_pop_params((args.len() as i32 + 1) * VAR_SIZE);
            result.map(Value::direct)
        } else {
            let label = self.layout.label_of.get(&fn_decl)?.clone();
            let result = self.gen_lcall(&label, has_return);
            self.gen_pop_params(args.len() as i32 * VAR_SIZE);
            result.map(Value::direct)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::layout;
    use crate::frontend::AstBuilder;
    use crate::sema::analyzer::Analyzer;

    fn emit(b: &AstBuilder, program: &Program) -> Vec<Instr> {
        let analysis = Analyzer::new(&b.interner).analyze(program).unwrap();
        let plan = layout::plan(program, &analysis, &b.interner);
        CodeGen::emit_program(program, &analysis, &plan, &b.interner)
    }

    /// void main() { Print("hi"); }
    fn hello() -> (AstBuilder, Program) {
        let mut b = AstBuilder::new();
        let arg = b.string("hi");
        let print = b.print(vec![arg]);
        let void = b.ty(TypeExprKind::Void);
        let body = b.block(vec![], vec![print]);
        let main = Decl::Func(b.func("main", void, vec![], Some(body)));
        (b, Program { decls: vec![main] })
    }

    #[test]
    fn main_shape_and_frame_backpatch() {
        let (b, program) = hello();
        let code = emit(&b, &program);

        assert_eq!(code[0], Instr::Label { name: "main".into() });
        // two string temps live in the frame
        assert!(matches!(code[1], Instr::BeginFunc { frame_size: 8 }));
        assert_eq!(*code.last().unwrap(), Instr::EndFunc);

        let begin_count = code
            .iter()
            .filter(|i| matches!(i, Instr::BeginFunc { .. }))
            .count();
        let end_count = code.iter().filter(|i| matches!(i, Instr::EndFunc)).count();
        assert_eq!(begin_count, 1);
        assert_eq!(end_count, 1);
    }

    #[test]
    fn print_dispatches_and_appends_newline() {
        let (b, program) = hello();
        let code = emit(&b, &program);

        let calls: Vec<&str> = code
            .iter()
            .filter_map(|i| match i {
                Instr::LCall { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(calls, ["_PrintString", "_PrintString"]);

        let strings: Vec<&str> = code
            .iter()
            .filter_map(|i| match i {
                Instr::LoadString { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(strings, ["\"hi\"", "\"\\n\""]);
    }

    #[test]
    fn push_param_count_matches_arguments() {
        // void f(int a, int b) {} void main() { f(1, 2); }
        let mut b = AstBuilder::new();
        let ta = b.ty(TypeExprKind::Int);
        let pa = b.var_decl("a", ta);
        let tb = b.ty(TypeExprKind::Int);
        let pb = b.var_decl("b", tb);
        let void = b.ty(TypeExprKind::Void);
        let fbody = b.block(vec![], vec![]);
        let f = Decl::Func(b.func("f", void, vec![pa, pb], Some(fbody)));

        let a1 = b.int(1);
        let a2 = b.int(2);
        let call = b.call(None, "f", vec![a1, a2]);
        let call_stmt = Stmt::Expr(call);
        let void2 = b.ty(TypeExprKind::Void);
        let mbody = b.block(vec![], vec![call_stmt]);
        let main = Decl::Func(b.func("main", void2, vec![], Some(mbody)));

        let program = Program { decls: vec![f, main] };
        let code = emit(&b, &program);

        let pushes = code
            .iter()
            .filter(|i| matches!(i, Instr::PushParam { .. }))
            .count();
        assert_eq!(pushes, 2);
        assert!(code.iter().any(|i| matches!(
            i,
            Instr::LCall { label, dst: None } if label == "_f"
        )));
        assert!(code
            .iter()
            .any(|i| matches!(i, Instr::PopParams { bytes: 8 })));
    }

    #[test]
    fn param_and_local_offsets() {
        // int f(int a, int b) { int x; x = a; return x; }
        let mut b = AstBuilder::new();
        let ta = b.ty(TypeExprKind::Int);
        let pa = b.var_decl("a", ta);
        let tb = b.ty(TypeExprKind::Int);
        let pb = b.var_decl("b", tb);
        let tx = b.ty(TypeExprKind::Int);
        let x = b.var_decl("x", tx);
        let xr = b.var_ref("x");
        let ar = b.var_ref("a");
        let assign = b.assign(xr, ar);
        let xr2 = b.var_ref("x");
        let ret_stmt = b.ret(xr2);
        let int = b.ty(TypeExprKind::Int);
        let fbody = b.block(vec![x], vec![Stmt::Expr(assign), ret_stmt]);
        let f = Decl::Func(b.func("f", int, vec![pa, pb], Some(fbody)));

        let void = b.ty(TypeExprKind::Void);
        let one = b.int(1);
        let two = b.int(2);
        let call = b.call(None, "f", vec![one, two]);
        let mbody = b.block(vec![], vec![Stmt::Expr(call)]);
        let main = Decl::Func(b.func("main", void, vec![], Some(mbody)));

        let program = Program { decls: vec![f, main] };
        let code = emit(&b, &program);

        // x = a lowers to Assign{dst: x@-8, src: a@+4}
        let assign = code
            .iter()
            .find_map(|i| match i {
                Instr::Assign { dst, src } if dst.name == "x" => Some((dst, src)),
                _ => None,
            })
            .expect("assignment emitted");
        assert_eq!(assign.0.offset, -8);
        assert_eq!(assign.1.name, "a");
        assert_eq!(assign.1.offset, 4);
    }

    #[test]
    fn methods_reserve_receiver_slot() {
        // class A { int v; void set(int n) { v = n; } } + main using it
        let mut b = AstBuilder::new();
        let tv = b.ty(TypeExprKind::Int);
        let v = Decl::Var(b.var_decl("v", tv));
        let tn = b.ty(TypeExprKind::Int);
        let n = b.var_decl("n", tn);
        let vr = b.var_ref("v");
        let nr = b.var_ref("n");
        let assign = b.assign(vr, nr);
        let void = b.ty(TypeExprKind::Void);
        let sbody = b.block(vec![], vec![Stmt::Expr(assign)]);
        let set = Decl::Func(b.func("set", void, vec![n], Some(sbody)));
        let class_a = Decl::Class(b.class("A", None, vec![], vec![v, set]));

        let void2 = b.ty(TypeExprKind::Void);
        let mbody = b.block(vec![], vec![]);
        let main = Decl::Func(b.func("main", void2, vec![], Some(mbody)));

        let program = Program {
            decls: vec![class_a, main],
        };
        let code = emit(&b, &program);

        // n lands at +8 because `this` takes +4
        let store = code
            .iter()
            .find_map(|i| match i {
                Instr::Store { dst, src, offset } => Some((dst, src, offset)),
                _ => None,
            })
            .expect("field store emitted");
        assert_eq!(store.0.name, "this");
        assert_eq!(store.1.offset, 8);
        assert_eq!(*store.2, 4, "field v at offset 4 in the instance");
    }

    #[test]
    fn vtable_emitted_with_flattened_labels() {
        let mut b = AstBuilder::new();
        let int = b.ty(TypeExprKind::Int);
        let lit = b.int(1);
        let r = b.ret(lit);
        let gbody = b.block(vec![], vec![r]);
        let get = Decl::Func(b.func("get", int, vec![], Some(gbody)));
        let void = b.ty(TypeExprKind::Void);
        let sbody = b.block(vec![], vec![]);
        let set = Decl::Func(b.func("set", void, vec![], Some(sbody)));
        let class_a = Decl::Class(b.class("A", None, vec![], vec![get, set]));
        let void2 = b.ty(TypeExprKind::Void);
        let mbody = b.block(vec![], vec![]);
        let main = Decl::Func(b.func("main", void2, vec![], Some(mbody)));

        let program = Program {
            decls: vec![class_a, main],
        };
        let code = emit(&b, &program);

        let vtable = code
            .iter()
            .find_map(|i| match i {
                Instr::VTable { label, methods } => Some((label, methods)),
                _ => None,
            })
            .expect("vtable emitted");
        assert_eq!(vtable.0, "A");
        assert_eq!(vtable.1, &["_A.get", "_A.set"]);
    }

    #[test]
    fn bounds_check_aborts_with_message() {
        // void main() { int[] a; a = NewArray(3, int); a[0] = 1; }
        let mut b = AstBuilder::new();
        let int = b.ty(TypeExprKind::Int);
        let arr_ty = b.array_ty(int);
        let a = b.var_decl("a", arr_ty);
        let ar = b.var_ref("a");
        let three = b.int(3);
        let elem = b.ty(TypeExprKind::Int);
        let new_arr = b.expr(ExprKind::NewArray {
            size: Box::new(three),
            elem,
        });
        let alloc = b.assign(ar, new_arr);
        let ar2 = b.var_ref("a");
        let zero = b.int(0);
        let access = b.expr(ExprKind::ArrayAccess {
            base: Box::new(ar2),
            subscript: Box::new(zero),
        });
        let one = b.int(1);
        let store = b.assign(access, one);
        let void = b.ty(TypeExprKind::Void);
        let body = b.block(vec![a], vec![Stmt::Expr(alloc), Stmt::Expr(store)]);
        let main = Decl::Func(b.func("main", void, vec![], Some(body)));

        let program = Program { decls: vec![main] };
        let code = emit(&b, &program);

        let strings: Vec<&str> = code
            .iter()
            .filter_map(|i| match i {
                Instr::LoadString { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert!(strings.contains(&"\"Array size is <= 0\\n\""));
        assert!(strings.contains(&"\"subscript out of bound\\n\""));

        let halts = code
            .iter()
            .filter(|i| matches!(i, Instr::LCall { label, .. } if label == "_Halt"))
            .count();
        assert_eq!(halts, 2, "size check and bounds check each abort");

        // The length lives one word before the data
        assert!(code
            .iter()
            .any(|i| matches!(i, Instr::Load { offset: -4, .. })));
    }
}
