// src/codegen/tac.rs
//
// Three-address code. Each instruction owns its operands; the debugging
// comment the assembly stream carries for each instruction is derived from
// them on demand.

use crate::codegen::location::Location;

/// Binary operators at the TAC level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl TacOp {
    /// Surface operator spelling, as it appears in TAC comments
    pub fn symbol(self) -> &'static str {
        match self {
            TacOp::Add => "+",
            TacOp::Sub => "-",
            TacOp::Mul => "*",
            TacOp::Div => "/",
            TacOp::Mod => "%",
            TacOp::Eq => "==",
            TacOp::Ne => "!=",
            TacOp::Lt => "<",
            TacOp::Le => "<=",
            TacOp::Gt => ">",
            TacOp::Ge => ">=",
            TacOp::And => "&&",
            TacOp::Or => "||",
        }
    }

    pub fn from_symbol(sym: &str) -> Option<TacOp> {
        Some(match sym {
            "+" => TacOp::Add,
            "-" => TacOp::Sub,
            "*" => TacOp::Mul,
            "/" => TacOp::Div,
            "%" => TacOp::Mod,
            "==" => TacOp::Eq,
            "!=" => TacOp::Ne,
            "<" => TacOp::Lt,
            "<=" => TacOp::Le,
            ">" => TacOp::Gt,
            ">=" => TacOp::Ge,
            "&&" => TacOp::And,
            "||" => TacOp::Or,
            _ => return None,
        })
    }

    /// Target-assembly mnemonic. Division and modulo are the signed ops.
    pub fn mips_name(self) -> &'static str {
        match self {
            TacOp::Add => "add",
            TacOp::Sub => "sub",
            TacOp::Mul => "mul",
            TacOp::Div => "div",
            TacOp::Mod => "rem",
            TacOp::Eq => "seq",
            TacOp::Ne => "sne",
            TacOp::Lt => "slt",
            TacOp::Le => "sle",
            TacOp::Gt => "sgt",
            TacOp::Ge => "sge",
            TacOp::And => "and",
            TacOp::Or => "or",
        }
    }
}

/// TAC instruction stream element. `LoadString` carries its payload
/// already quoted.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    LoadConst {
        dst: Location,
        value: i32,
    },
    LoadString {
        dst: Location,
        value: String,
    },
    LoadLabel {
        dst: Location,
        label: String,
    },
    Assign {
        dst: Location,
        src: Location,
    },
    Load {
        dst: Location,
        src: Location,
        offset: i32,
    },
    Store {
        dst: Location,
        src: Location,
        offset: i32,
    },
    Binary {
        op: TacOp,
        dst: Location,
        lhs: Location,
        rhs: Location,
    },
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
    IfZ {
        test: Location,
        label: String,
    },
    /// Frame size is backpatched once the function body has been emitted
    BeginFunc {
        frame_size: i32,
    },
    EndFunc,
    Return {
        value: Option<Location>,
    },
    PushParam {
        param: Location,
    },
    PopParams {
        bytes: i32,
    },
    LCall {
        label: String,
        dst: Option<Location>,
    },
    ACall {
        addr: Location,
        dst: Option<Location>,
    },
    VTable {
        label: String,
        methods: Vec<String>,
    },
}

impl Instr {
    /// The debugging comment emitted above the lowered instruction;
    /// labels have none.
    pub fn comment(&self) -> Option<String> {
        Some(match self {
            Instr::LoadConst { dst, value } => format!("{} = {}", dst.name, value),
            Instr::LoadString { dst, value } => {
                let truncated: String = value.chars().take(50).collect();
                let ellipsis = if value.chars().count() > 50 { "...\"" } else { "" };
                format!("{} = {}{}", dst.name, truncated, ellipsis)
            }
            Instr::LoadLabel { dst, label } => format!("{} = {}", dst.name, label),
            Instr::Assign { dst, src } => format!("{} = {}", dst.name, src.name),
            Instr::Load { dst, src, offset } => {
                if *offset != 0 {
                    format!("{} = *({} + {})", dst.name, src.name, offset)
                } else {
                    format!("{} = *({})", dst.name, src.name)
                }
            }
            Instr::Store { dst, src, offset } => {
                if *offset != 0 {
                    format!("*({} + {}) = {}", dst.name, offset, src.name)
                } else {
                    format!("*({}) = {}", dst.name, src.name)
                }
            }
            Instr::Binary { op, dst, lhs, rhs } => {
                format!("{} = {} {} {}", dst.name, lhs.name, op.symbol(), rhs.name)
            }
            Instr::Label { .. } => return None,
            Instr::Goto { label } => format!("Goto {}", label),
            Instr::IfZ { test, label } => format!("IfZ {} Goto {}", test.name, label),
            Instr::BeginFunc { frame_size } => format!("BeginFunc {}", frame_size),
            Instr::EndFunc => "EndFunc".to_string(),
            Instr::Return { value } => format!(
                "Return {}",
                value.as_ref().map(|v| v.name.as_str()).unwrap_or("")
            ),
            Instr::PushParam { param } => format!("PushParam {}", param.name),
            Instr::PopParams { bytes } => format!("PopParams {}", bytes),
            Instr::LCall { label, dst } => match dst {
                Some(d) => format!("{} = LCall {}", d.name, label),
                None => format!("LCall {}", label),
            },
            Instr::ACall { addr, dst } => match dst {
                Some(d) => format!("{} = ACall {}", d.name, addr.name),
                None => format!("ACall {}", addr.name),
            },
            Instr::VTable { label, .. } => format!("VTable for class {}", label),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::location::Segment;

    fn tmp(n: u32) -> Location {
        Location::new(Segment::FpRelative, -8 - 4 * n as i32, format!("_tmp{}", n))
    }

    #[test]
    fn op_symbol_round_trip() {
        for op in [
            TacOp::Add,
            TacOp::Sub,
            TacOp::Mul,
            TacOp::Div,
            TacOp::Mod,
            TacOp::Eq,
            TacOp::Ne,
            TacOp::Lt,
            TacOp::Le,
            TacOp::Gt,
            TacOp::Ge,
            TacOp::And,
            TacOp::Or,
        ] {
            assert_eq!(TacOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(TacOp::from_symbol("<>"), None);
    }

    #[test]
    fn mips_names() {
        assert_eq!(TacOp::Mod.mips_name(), "rem");
        assert_eq!(TacOp::Eq.mips_name(), "seq");
        assert_eq!(TacOp::Le.mips_name(), "sle");
    }

    #[test]
    fn comment_formats() {
        assert_eq!(
            Instr::LoadConst { dst: tmp(0), value: 42 }.comment().unwrap(),
            "_tmp0 = 42"
        );
        assert_eq!(
            Instr::Load { dst: tmp(1), src: tmp(0), offset: -4 }
                .comment()
                .unwrap(),
            "_tmp1 = *(_tmp0 + -4)"
        );
        assert_eq!(
            Instr::Load { dst: tmp(1), src: tmp(0), offset: 0 }
                .comment()
                .unwrap(),
            "_tmp1 = *(_tmp0)"
        );
        assert_eq!(
            Instr::Binary {
                op: TacOp::Sub,
                dst: tmp(2),
                lhs: tmp(0),
                rhs: tmp(1),
            }
            .comment()
            .unwrap(),
            "_tmp2 = _tmp0 - _tmp1"
        );
        assert_eq!(
            Instr::LCall { label: "_f".into(), dst: Some(tmp(0)) }
                .comment()
                .unwrap(),
            "_tmp0 = LCall _f"
        );
        assert_eq!(
            Instr::LCall { label: "_Halt".into(), dst: None }
                .comment()
                .unwrap(),
            "LCall _Halt"
        );
        assert_eq!(Instr::Label { name: "_L0".into() }.comment(), None);
        assert_eq!(
            Instr::Return { value: None }.comment().unwrap(),
            "Return "
        );
    }

    #[test]
    fn long_string_comment_is_truncated() {
        let long = format!("\"{}\"", "x".repeat(80));
        let instr = Instr::LoadString { dst: tmp(0), value: long };
        let comment = instr.comment().unwrap();
        assert!(comment.ends_with("...\""));
        assert!(comment.len() < 70);
    }
}
