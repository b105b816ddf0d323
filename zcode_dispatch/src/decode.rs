// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured instruction decoding, one planner per instruction class.
//!
//! A [`DecodePlan`] describes a single dispatch case: which leading byte selects it, where each
//! operand lives relative to `pc`, and where the store byte, branch descriptor, and packed text
//! sit. Offsets are split into a static part and a flag saying whether the run-time `padding`
//! (extra bytes reported by a type-byte helper, a long branch, or packed text) must be added.
//!
//! The emitter in [`crate::emit`] only formats these plans.

use core::fmt;

use crate::table::{OpClass, OpFlags, Operation};

/// Leading byte of every extended instruction.
pub const EXTENDED_ESCAPE: u8 = 0xBE;

/// How a dispatch case is selected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lead {
    /// A case of the top-level switch on the instruction byte.
    Byte(u8),
    /// A case of the nested switch on the byte after [`EXTENDED_ESCAPE`].
    Extended(u8),
}

impl Lead {
    /// The byte value the case label matches.
    #[must_use]
    pub fn byte(self) -> u8 {
        match self {
            Self::Byte(b) | Self::Extended(b) => b,
        }
    }
}

/// Which encoding a case decodes, for case comments and trace output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Form {
    /// The class's usual encoding.
    Standard,
    /// A `2OP` opcode in variable form.
    Variable,
}

/// Addressing mode of an inline operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// Two-byte big-endian constant.
    LargeConstant,
    /// One-byte constant.
    SmallConstant,
    /// One byte naming a variable to read.
    Variable,
}

impl OperandKind {
    /// Bytes the operand occupies.
    #[must_use]
    pub fn width(self) -> u8 {
        match self {
            Self::LargeConstant => 2,
            Self::SmallConstant | Self::Variable => 1,
        }
    }
}

/// An inline operand at a static offset from `pc`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operand {
    /// Addressing mode.
    pub kind: OperandKind,
    /// Offset of the operand's first byte.
    pub at: u8,
}

/// Run-time helper that decodes operand type bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeByteHelper {
    /// One type byte, up to four operands.
    Single,
    /// Two type bytes, up to eight operands.
    Double,
}

/// Where operands come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operands {
    /// No operands.
    None,
    /// One inline operand.
    One(Operand),
    /// Two inline operands.
    Two(Operand, Operand),
    /// Operands decoded at run time; `padding` becomes the helper result minus `bias`.
    Helper {
        /// Which helper.
        helper: TypeByteHelper,
        /// Offset of the first type byte.
        at: u8,
        /// Operand bytes already counted in the static offsets.
        bias: u8,
    },
}

/// A position relative to `pc`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Offset {
    /// Statically known byte count.
    pub fixed: u8,
    /// Whether the run-time `padding` is added.
    pub padded: bool,
}

/// Packed-text operand handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StringOperand {
    /// Decoded by the packed-text routine starting at the given offset.
    Packed(Offset),
    /// Not decoded yet for this class; consumes nothing.
    Pending,
}

/// Everything needed to emit one dispatch case.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodePlan {
    /// Case selector.
    pub lead: Lead,
    /// Encoding variant.
    pub form: Form,
    /// Operand sources.
    pub operands: Operands,
    /// Operand count recorded for fixed-arity opcodes used in variable contexts.
    pub counts_operands: Option<u8>,
    /// Store destination byte.
    pub store: Option<Offset>,
    /// First branch descriptor byte.
    pub branch: Option<Offset>,
    /// Packed-text literal.
    pub string: Option<StringOperand>,
    /// Total instruction length (the `pc` advance).
    pub length: Offset,
}

/// Returns the dispatch cases for `op`, in emission order.
#[must_use]
pub fn plan(op: &Operation) -> Vec<DecodePlan> {
    match op.class {
        OpClass::Zero => vec![plan_zero(op)],
        OpClass::Unary => plan_unary(op),
        OpClass::Binary => plan_binary(op),
        OpClass::Variable => vec![plan_variable(op)],
        OpClass::Extended => vec![plan_extended(op)],
    }
}

fn plan_zero(op: &Operation) -> DecodePlan {
    Trailing::at(1).finish(
        Lead::Byte(0xB0 | op.value),
        Form::Standard,
        Operands::None,
        None,
        op.flags,
        TextSupport::Packed,
    )
}

fn plan_unary(op: &Operation) -> Vec<DecodePlan> {
    [
        OperandKind::LargeConstant,
        OperandKind::SmallConstant,
        OperandKind::Variable,
    ]
    .into_iter()
    .enumerate()
    .map(|(y, kind)| {
        let arg = Operand { kind, at: 1 };
        // `y` is at most 2.
        let mode = (y as u8) << 4;
        Trailing::at(1 + kind.width()).finish(
            Lead::Byte(0x80 | mode | op.value),
            Form::Standard,
            Operands::One(arg),
            None,
            op.flags,
            TextSupport::Pending,
        )
    })
    .collect()
}

fn plan_binary(op: &Operation) -> Vec<DecodePlan> {
    let counts = op.flags.counts_operands.then_some(2);
    let mut plans: Vec<DecodePlan> = (0_u8..4)
        .map(|y| {
            let kind = |var: bool| {
                if var {
                    OperandKind::Variable
                } else {
                    OperandKind::SmallConstant
                }
            };
            let a = Operand {
                kind: kind(y & 2 != 0),
                at: 1,
            };
            let b = Operand {
                kind: kind(y & 1 != 0),
                at: 2,
            };
            Trailing::at(3).finish(
                Lead::Byte((y << 5) | op.value),
                Form::Standard,
                Operands::Two(a, b),
                counts,
                op.flags,
                TextSupport::Packed,
            )
        })
        .collect();

    // Variable form: opcode, type byte, then operands through the single-type-byte helper. The
    // two operand bytes of the common case are counted statically, so the helper result is
    // biased by 2.
    plans.push(Trailing::padded_at(4).finish(
        Lead::Byte(0xC0 | op.value),
        Form::Variable,
        Operands::Helper {
            helper: TypeByteHelper::Single,
            at: 1,
            bias: 2,
        },
        None,
        op.flags,
        TextSupport::Packed,
    ));
    plans
}

fn helper_for(flags: OpFlags) -> TypeByteHelper {
    if flags.double {
        TypeByteHelper::Double
    } else {
        TypeByteHelper::Single
    }
}

fn type_bytes(helper: TypeByteHelper) -> u8 {
    match helper {
        TypeByteHelper::Single => 1,
        TypeByteHelper::Double => 2,
    }
}

fn plan_variable(op: &Operation) -> DecodePlan {
    let helper = helper_for(op.flags);
    Trailing::padded_at(1 + type_bytes(helper)).finish(
        Lead::Byte(0xE0 | op.value),
        Form::Standard,
        Operands::Helper {
            helper,
            at: 1,
            bias: 0,
        },
        None,
        op.flags,
        TextSupport::Packed,
    )
}

fn plan_extended(op: &Operation) -> DecodePlan {
    let helper = helper_for(op.flags);
    Trailing::padded_at(2 + type_bytes(helper)).finish(
        Lead::Extended(op.value),
        Form::Standard,
        Operands::Helper {
            helper,
            at: 2,
            bias: 0,
        },
        None,
        op.flags,
        TextSupport::Packed,
    )
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TextSupport {
    Packed,
    Pending,
}

/// Cursor over the bytes after the operands.
#[derive(Copy, Clone, Debug)]
struct Trailing {
    at: u8,
    padded: bool,
}

impl Trailing {
    fn at(at: u8) -> Self {
        Self { at, padded: false }
    }

    fn padded_at(at: u8) -> Self {
        Self { at, padded: true }
    }

    fn here(self) -> Offset {
        Offset {
            fixed: self.at,
            padded: self.padded,
        }
    }

    fn finish(
        mut self,
        lead: Lead,
        form: Form,
        operands: Operands,
        counts_operands: Option<u8>,
        flags: OpFlags,
        text: TextSupport,
    ) -> DecodePlan {
        let store = flags.store.then(|| {
            let off = self.here();
            self.at += 1;
            off
        });
        let branch = flags.branch.then(|| {
            let off = self.here();
            self.at += 1;
            self.padded = true;
            off
        });
        let string = flags.string.then(|| match text {
            TextSupport::Packed => {
                let off = self.here();
                self.padded = true;
                StringOperand::Packed(off)
            }
            TextSupport::Pending => StringOperand::Pending,
        });
        DecodePlan {
            lead,
            form,
            operands,
            counts_operands,
            store,
            branch,
            string,
            length: self.here(),
        }
    }
}

/// A decode error for raw instruction bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended inside a branch descriptor.
    UnexpectedEof,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// A decoded branch descriptor.
///
/// This is the wire format the emitted branch code implements, kept here as the reference the
/// emitter is tested against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BranchDescriptor {
    /// Branch field: 6 bits unsigned in the short form, 14 bits signed in the long form.
    pub offset: i16,
    /// Branch when the condition is false.
    pub negate: bool,
}

impl BranchDescriptor {
    /// Decodes a descriptor from the start of `bytes`, returning it and the bytes consumed.
    ///
    /// Bit `0x40` of the first byte selects the one-byte form. In the two-byte form the 6-bit
    /// field is sign-extended (bit `0x20`) before the second byte is appended.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let b = *bytes.first().ok_or(DecodeError::UnexpectedEof)?;
        let negate = b & 0x80 != 0;
        let mut offset = i16::from(b & 0x3F);
        if b & 0x40 != 0 {
            return Ok((Self { offset, negate }, 1));
        }
        let next = *bytes.get(1).ok_or(DecodeError::UnexpectedEof)?;
        if offset & 0x20 != 0 {
            offset -= 64;
        }
        offset = (offset << 8) | i16::from(next);
        Ok((Self { offset, negate }, 2))
    }
}
