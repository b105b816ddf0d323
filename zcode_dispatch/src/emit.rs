// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! C text emission for dispatch cases and action blocks.
//!
//! The emitted fragment expects the surrounding fetch loop to declare `instr`, `pc`, `st`, `tmp`,
//! `branch`, `padding`, `negate`, `string`, `arg1`, `arg2`, `argblock`, and `stack`, and to provide
//! the `loop` label (plus `version` for version-independent builds).

use crate::decode::{
    DecodePlan, EXTENDED_ESCAPE, Form, Lead, Offset, Operand, OperandKind, Operands,
    StringOperand, TypeByteHelper,
};
use crate::table::Operation;
use crate::version::Target;

/// Nesting level of a case label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Depth {
    /// Top-level instruction switch.
    Top,
    /// Extended sub-opcode switch.
    Nested,
}

impl Depth {
    fn case_indent(self) -> &'static str {
        match self {
            Self::Top => "    ",
            Self::Nested => "        ",
        }
    }

    fn body_indent(self) -> &'static str {
        match self {
            Self::Top => "      ",
            Self::Nested => "          ",
        }
    }
}

pub(crate) fn dispatch_header(out: &mut String, target: Target) {
    out.push_str("/*\n");
    out.push_str(&format!(
        " * Interpreter automatically generated for {target}\n"
    ));
    out.push_str(" * Do not alter this file\n");
    out.push_str(" */\n\n");
    out.push_str("  switch (instr)\n");
    out.push_str("    {\n");
}

pub(crate) fn skipped(out: &mut String, op: &Operation, target: Target) {
    match target {
        Target::Version(v) => out.push_str(&format!("    /* {} not in version {v} */\n", op.name)),
        Target::Independent => {
            out.push_str(&format!("    /* {} is version-specific */\n", op.name));
        }
    }
}

fn address(off: Offset) -> String {
    if off.padded {
        format!("pc+{}+padding", off.fixed)
    } else {
        format!("pc+{}", off.fixed)
    }
}

fn operand_expr(arg: Operand) -> String {
    match arg.kind {
        OperandKind::LargeConstant => {
            format!("(GetCode(pc+{})<<8)|GetCode(pc+{})", arg.at, arg.at + 1)
        }
        OperandKind::SmallConstant => format!("GetCode(pc+{})", arg.at),
        OperandKind::Variable => format!("GetVar(GetCode(pc+{}))", arg.at),
    }
}

fn helper_fn(helper: TypeByteHelper) -> &'static str {
    match helper {
        TypeByteHelper::Single => "zmachine_decode_varop",
        TypeByteHelper::Double => "zmachine_decode_doubleop",
    }
}

/// Emits one dispatch case: label, decode, `pc` advance, and the jump to the action block.
pub(crate) fn case(
    out: &mut String,
    op: &Operation,
    plan: &DecodePlan,
    depth: Depth,
    debug_trace: bool,
) {
    let ind = depth.body_indent();
    let comment = match plan.form {
        Form::Standard => op.name.clone(),
        Form::Variable => format!("{} - variable form", op.name),
    };
    out.push_str(&format!(
        "{}case 0x{:x}: /* {comment} */\n",
        depth.case_indent(),
        plan.lead.byte()
    ));

    if debug_trace {
        let trace = match (plan.lead, plan.form) {
            (Lead::Extended(_), _) => format!("ExtOp: {}", op.name),
            (Lead::Byte(_), Form::Variable) => format!("{} (var form)", op.name),
            (Lead::Byte(_), Form::Standard) => op.name.clone(),
        };
        out.push_str("#ifdef DEBUG\n");
        out.push_str(&format!("printf(\"{trace}\\n\");\n"));
        out.push_str("#endif\n");
    }

    if let Some(n) = plan.counts_operands {
        out.push_str(&format!("{ind}argblock.n_args = {n};\n"));
    }

    match plan.operands {
        Operands::None => {}
        Operands::One(a) => {
            out.push_str(&format!("{ind}arg1 = {};\n", operand_expr(a)));
        }
        Operands::Two(a, b) => {
            out.push_str(&format!("{ind}arg1 = {};\n", operand_expr(a)));
            out.push_str(&format!("{ind}arg2 = {};\n", operand_expr(b)));
        }
        Operands::Helper { helper, at, bias } => {
            let bias = if bias == 0 {
                String::new()
            } else {
                format!("-{bias}")
            };
            out.push_str(&format!(
                "{ind}padding = {}(stack, &GetCode(pc+{at}), &argblock){bias};\n",
                helper_fn(helper)
            ));
        }
    }

    if let Some(off) = plan.store {
        out.push_str(&format!("{ind}st = GetCode({});\n", address(off)));
    }

    if let Some(off) = plan.branch {
        branch(out, ind, off);
    }

    match plan.string {
        None => {}
        Some(StringOperand::Packed(off)) if off.padded => {
            out.push_str(&format!("{ind}{{\n"));
            out.push_str(&format!("{ind}  int strpad;\n"));
            out.push_str(&format!(
                "{ind}  string = zscii_to_ascii(&GetCode({}), &strpad);\n",
                address(off)
            ));
            out.push_str(&format!("{ind}  padding += strpad;\n"));
            out.push_str(&format!("{ind}}}\n"));
        }
        Some(StringOperand::Packed(off)) => {
            out.push_str(&format!(
                "{ind}string = zscii_to_ascii(&GetCode({}), &padding);\n",
                address(off)
            ));
        }
        Some(StringOperand::Pending) => {
            out.push_str(&format!("{ind}/* packed-text operand not decoded in this form */\n"));
        }
    }

    let advance = if plan.length.padded {
        format!("{}+padding", plan.length.fixed)
    } else {
        plan.length.fixed.to_string()
    };
    out.push_str(&format!("{ind}pc += {advance};\n"));
    out.push_str(&format!("{ind}goto {};\n\n", op.label()));
}

/// Branch descriptor decode; see [`crate::decode::BranchDescriptor::decode`] for the format.
fn branch(out: &mut String, ind: &str, off: Offset) {
    out.push_str(&format!("{ind}tmp = GetCode({});\n", address(off)));
    out.push_str(&format!("{ind}branch = tmp&0x3f;\n"));
    if !off.padded {
        out.push_str(&format!("{ind}padding = 0;\n"));
    }
    out.push_str(&format!("{ind}if (!(tmp&0x40))\n"));
    out.push_str(&format!("{ind}  {{\n"));
    if off.padded {
        out.push_str(&format!("{ind}    padding++;\n"));
    } else {
        out.push_str(&format!("{ind}    padding = 1;\n"));
    }
    out.push_str(&format!("{ind}    if (branch&0x20)\n"));
    out.push_str(&format!("{ind}      branch -= 64;\n"));
    out.push_str(&format!("{ind}    branch <<= 8;\n"));
    let second = if off.padded {
        address(off)
    } else {
        format!("pc+{}", off.fixed + 1)
    };
    out.push_str(&format!("{ind}    branch |= GetCode({second});\n"));
    out.push_str(&format!("{ind}  }}\n"));
    out.push_str(&format!("{ind}negate = tmp&0x80;\n"));
}

pub(crate) fn extended_open(out: &mut String) {
    out.push_str(&format!(
        "    case 0x{EXTENDED_ESCAPE:x}: /* Extended ops */\n"
    ));
    out.push_str("      switch (GetCode(pc+1))\n");
    out.push_str("        {\n");
}

pub(crate) fn extended_close(out: &mut String) {
    out.push_str("        default:\n");
    out.push_str("          zmachine_fatal(\"Unknown extended opcode: %x\", GetCode(pc+1));\n");
    out.push_str("        }\n");
}

pub(crate) fn dispatch_footer(out: &mut String, target: Target) {
    out.push_str("    default:\n");
    match target {
        Target::Version(_) => {
            out.push_str("      zmachine_fatal(\"Unknown opcode: %x\", GetCode(pc));\n");
        }
        Target::Independent => out.push_str("      goto version;\n"),
    }
    out.push_str("    }\n");
}

/// Escapes `s` for a C string literal. Control characters become three-digit octal escapes.
fn c_string_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            c if c.is_ascii_control() => escaped.push_str(&format!("\\{:03o}", u32::from(c))),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Tracks the line count of a fragment so `#line` can point back into it after an action body.
#[derive(Debug)]
pub(crate) struct LineSync<'a> {
    file: &'a str,
    counted: usize,
    lines: usize,
}

impl<'a> LineSync<'a> {
    pub(crate) fn new(file: &'a str) -> Self {
        Self {
            file,
            counted: 0,
            lines: 0,
        }
    }

    /// The line number of the line after the next one written to `out`.
    fn following_line(&mut self, out: &str) -> usize {
        self.lines += out[self.counted..].matches('\n').count();
        self.counted = out.len();
        self.lines + 2
    }
}

/// Emits the guarded, labeled action block for `op`.
///
/// A body is preceded by a `#line` naming its definition. With `sync`, a second `#line` after the
/// body returns the rest of the fragment to the generated file.
pub(crate) fn action_block(out: &mut String, op: &Operation, sync: Option<&mut LineSync<'_>>) {
    let guard = op.guard();
    out.push_str(&format!("#ifndef {guard}\n"));
    out.push_str(&format!("# define {guard}\n"));
    out.push_str(&format!("  {}:\n", op.label()));
    match &op.body {
        None => {
            out.push_str(&format!(
                "    zmachine_warning(\"{} not implemented\");\n",
                op.name
            ));
        }
        Some(body) => {
            out.push_str("    {\n");
            // Line 0 is not a valid presumed line.
            out.push_str(&format!(
                "#line {} \"{}\"\n",
                op.location.line.max(1),
                c_string_escape(&op.location.file)
            ));
            out.push_str(body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("    }\n");
            if let Some(sync) = sync {
                let next = sync.following_line(out);
                out.push_str(&format!("#line {next} \"{}\"\n", c_string_escape(sync.file)));
            }
        }
    }
    out.push_str("    goto loop;\n\n");
    out.push_str("#endif\n");
}
