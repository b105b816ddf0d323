// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The operation table: one record per opcode name and version variant.
//!
//! Tables are built once by a loader, ordered once (see [`crate::order`]), and then only read
//! by the generator.

use core::fmt;

use crate::version::VersionMask;

/// Instruction encoding class.
///
/// Variant order is the primary ordering key of the table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpClass {
    /// `0OP`: no operands.
    Zero,
    /// `1OP`: one operand, three addressing variants.
    Unary,
    /// `2OP`: two operands, four long-form variants plus a variable form.
    Binary,
    /// `VAR`: up to four (or eight) operands described by type bytes.
    Variable,
    /// `EXT`: escape byte followed by a sub-opcode, then `VAR`-style operands.
    Extended,
}

impl OpClass {
    /// Largest opcode value that fits this class's leading byte.
    #[must_use]
    pub fn max_value(self) -> u8 {
        match self {
            Self::Zero | Self::Unary => 0x0F,
            Self::Binary | Self::Variable => 0x1F,
            Self::Extended => 0xFF,
        }
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0OP",
            Self::Unary => "1OP",
            Self::Binary => "2OP",
            Self::Variable => "VAR",
            Self::Extended => "EXT",
        }
    }
}

impl fmt::Display for OpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation decode flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpFlags {
    /// A store-destination byte follows the operands.
    pub store: bool,
    /// A branch descriptor follows the store byte (if any).
    pub branch: bool,
    /// A packed-text literal follows everything else.
    pub string: bool,
    /// Uses the eight-operand, two-type-byte form.
    pub double: bool,
    /// Records the operand count for fixed-arity opcodes reused in variable contexts.
    pub counts_operands: bool,
}

/// Where an action body was written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Definition file, as it should appear in diagnostics.
    pub file: String,
    /// 1-based line of the first body line.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One operation variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    /// Label stem; unique only together with `versions`.
    pub name: String,
    /// Encoding class.
    pub class: OpClass,
    /// Opcode number within the class.
    pub value: u8,
    /// Versions this variant applies to.
    pub versions: VersionMask,
    /// Decode flags.
    pub flags: OpFlags,
    /// Hand-written action code; `None` emits a "not implemented" stub.
    pub body: Option<String>,
    /// Definition site of `body`.
    pub location: SourceLocation,
}

impl Operation {
    /// Creates an operation without flags or body.
    #[must_use]
    pub fn new(name: impl Into<String>, class: OpClass, value: u8, versions: VersionMask) -> Self {
        Self {
            name: name.into(),
            class,
            value,
            versions,
            flags: OpFlags::default(),
            body: None,
            location: SourceLocation::new("<unknown>", 1),
        }
    }

    /// Replaces the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: OpFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the action body and where it was defined.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>, location: SourceLocation) -> Self {
        self.body = Some(body.into());
        self.location = location;
        self
    }

    /// Ordering key: class, then value.
    #[must_use]
    pub fn sort_key(&self) -> (OpClass, u8) {
        (self.class, self.value)
    }

    /// Jump label this variant's cases transfer to.
    #[must_use]
    pub fn label(&self) -> String {
        crate::version::op_label(&self.name, self.versions)
    }

    /// Guard identifier for this variant's action block.
    #[must_use]
    pub fn guard(&self) -> String {
        crate::version::guard_name(&self.name, self.versions)
    }
}

/// An operation table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpTable {
    ops: Vec<Operation>,
}

impl OpTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the table has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in table order.
    #[must_use]
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub(crate) fn ops_mut(&mut self) -> &mut [Operation] {
        &mut self.ops
    }
}

impl FromIterator<Operation> for OpTable {
    fn from_iter<T: IntoIterator<Item = Operation>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl Extend<Operation> for OpTable {
    fn extend<T: IntoIterator<Item = Operation>>(&mut self, iter: T) {
        self.ops.extend(iter);
    }
}
