// src/codegen/mips.rs
//
// TAC to MIPS lowering. The register discipline is deliberately naive:
// three fixed temporaries, every operand read is a fill from its stack
// slot, every write a spill back. Correctness holds because each TAC
// instruction is self-contained; no values live across instructions.

use crate::codegen::location::{Location, Segment};
use crate::codegen::tac::Instr;

const RS: &str = "$t0";
const RT: &str = "$t1";
const RD: &str = "$t2";

pub struct Mips<'a> {
    out: &'a mut String,
    string_count: u32,
}

impl<'a> Mips<'a> {
    pub fn new(out: &'a mut String) -> Self {
        Self {
            out,
            string_count: 0,
        }
    }

    /// Shared line discipline: instructions are indented, labels are
    /// flush, whole-line comments get a bare tab.
    fn emit(&mut self, text: &str) {
        if !text.ends_with(':') {
            self.out.push('\t');
        }
        if !text.starts_with('#') {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn base_register(loc: &Location) -> &'static str {
        match loc.segment {
            Segment::FpRelative => "$fp",
            Segment::GpRelative => "$gp",
        }
    }

    fn fill(&mut self, src: &Location, reg: &str) {
        let base = Self::base_register(src);
        self.emit(&format!(
            "lw {}, {}({})\t# fill {} to {} from {}{:+}",
            reg, src.offset, base, src.name, reg, base, src.offset
        ));
    }

    fn spill(&mut self, dst: &Location, reg: &str) {
        let base = Self::base_register(dst);
        self.emit(&format!(
            "sw {}, {}({})\t# spill {} from {} to {}{:+}",
            reg, dst.offset, base, dst.name, reg, base, dst.offset
        ));
    }

    pub fn preamble(&mut self) {
        self.emit("# standard Decaf preamble ");
        self.emit(".text");
        self.emit(".align 2");
        self.emit(".globl main");
    }

    fn load_label(&mut self, dst: &Location, label: &str) {
        self.emit(&format!("la {}, {}\t# load label", RD, label));
        self.spill(dst, RD);
    }

    fn return_sequence(&mut self, value: Option<&Location>) {
        if let Some(value) = value {
            self.fill(value, RD);
            self.emit(&format!(
                "move $v0, {}\t\t# assign return value into $v0",
                RD
            ));
        }
        self.emit("move $sp, $fp\t\t# pop callee frame off stack");
        self.emit("lw $ra, -4($fp)\t# restore saved ra");
        self.emit("lw $fp, 0($fp)\t# restore saved fp");
        self.emit("jr $ra\t\t# return from function");
    }

    fn call_sequence(&mut self, dst: Option<&Location>, target: &str, direct: bool) {
        self.emit(&format!(
            "{} {:<15}\t# jump to function",
            if direct { "jal" } else { "jalr" },
            target
        ));
        if let Some(dst) = dst {
            self.emit(&format!(
                "move {}, $v0\t\t# copy function return value from $v0",
                RD
            ));
            self.spill(dst, RD);
        }
    }

    pub fn instr(&mut self, instr: &Instr) {
        if let Some(comment) = instr.comment() {
            self.emit(&format!("# {}", comment));
        }

        match instr {
            Instr::LoadConst { dst, value } => {
                self.emit(&format!(
                    "li {}, {}\t\t# load constant value {} into {}",
                    RD, value, value, RD
                ));
                self.spill(dst, RD);
            }
            Instr::LoadString { dst, value } => {
                self.string_count += 1;
                let label = format!("_string{}", self.string_count);
                self.emit(".data\t\t\t# create string constant marked with label");
                self.emit(&format!("{}: .asciiz {}", label, value));
                self.emit(".text");
                self.load_label(dst, &label);
            }
            Instr::LoadLabel { dst, label } => self.load_label(dst, label),
            Instr::Assign { dst, src } => {
                self.fill(src, RD);
                self.spill(dst, RD);
            }
            Instr::Load { dst, src, offset } => {
                self.fill(src, RS);
                self.emit(&format!("lw {}, {}({}) \t# load with offset", RD, offset, RS));
                self.spill(dst, RD);
            }
            Instr::Store { dst, src, offset } => {
                self.fill(src, RS);
                self.fill(dst, RD);
                self.emit(&format!(
                    "sw {}, {}({}) \t# store with offset",
                    RS, offset, RD
                ));
            }
            Instr::Binary { op, dst, lhs, rhs } => {
                self.fill(lhs, RS);
                self.fill(rhs, RT);
                self.emit(&format!("{} {}, {}, {}\t", op.mips_name(), RD, RS, RT));
                self.spill(dst, RD);
            }
            Instr::Label { name } => self.emit(&format!("{}:", name)),
            Instr::Goto { label } => {
                self.emit(&format!("b {}\t\t# unconditional branch", label))
            }
            Instr::IfZ { test, label } => {
                self.fill(test, RS);
                self.emit(&format!(
                    "beqz {}, {}\t# branch if {} is zero ",
                    RS, label, test.name
                ));
            }
            Instr::BeginFunc { frame_size } => {
                self.emit("subu $sp, $sp, 8\t# decrement sp to make space to save ra, fp");
                self.emit("sw $fp, 8($sp)\t# save fp");
                self.emit("sw $ra, 4($sp)\t# save ra");
                self.emit("addiu $fp, $sp, 8\t# set up new fp");
                if *frame_size != 0 {
                    self.emit(&format!(
                        "subu $sp, $sp, {}\t# decrement sp to make space for locals/temps",
                        frame_size
                    ));
                }
            }
            Instr::EndFunc => {
                self.emit("# (below handles reaching end of fn body with no explicit return)");
                self.return_sequence(None);
            }
            Instr::Return { value } => self.return_sequence(value.as_ref()),
            Instr::PushParam { param } => {
                self.emit("subu $sp, $sp, 4\t# decrement sp to make space for param");
                self.fill(param, RS);
                self.emit(&format!("sw {}, 4($sp)\t# copy param value to stack", RS));
            }
            Instr::PopParams { bytes } => {
                if *bytes != 0 {
                    self.emit(&format!("add $sp, $sp, {}\t# pop params off stack", bytes));
                }
            }
            Instr::LCall { label, dst } => self.call_sequence(dst.as_ref(), label, true),
            Instr::ACall { addr, dst } => {
                self.fill(addr, RS);
                self.call_sequence(dst.as_ref(), RS, false);
            }
            Instr::VTable { label, methods } => {
                self.emit(".data");
                self.emit(".align 2");
                self.emit(&format!("{}:\t\t# label for class {} vtable", label, label));
                for method in methods {
                    self.emit(&format!(".word {}\n", method));
                }
                self.emit(".text");
            }
        }
    }
}

/// Lower a whole TAC stream: preamble, every instruction, then the
/// prewritten runtime library.
pub fn lower(code: &[Instr]) -> String {
    let mut out = String::new();
    let mut mips = Mips::new(&mut out);
    mips.preamble();
    for instr in code {
        mips.instr(instr);
    }
    out.push_str("    # Prewritten asm\n");
    out.push_str(include_str!("builtin.asm"));
    out
}
