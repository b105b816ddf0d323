// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation passes over an ordered [`OpTable`].
//!
//! A [`Generator`] validates the table once, then produces the dispatch switch and the action
//! blocks for a single [`Target`]. Both passes select the same records.

use core::fmt;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::decode::{EXTENDED_ESCAPE, Lead, plan};
use crate::emit::{self, Depth, LineSync};
use crate::table::{OpClass, OpTable, Operation};
use crate::version::{Target, VersionMask};

/// Generation options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenOptions {
    /// Emit a `#ifdef DEBUG` trace line at the top of every case.
    pub debug_trace: bool,
    /// Name of the generated file. When set, a `#line` after every action body attributes the
    /// following lines to this file again, numbered from the start of the fragment.
    pub output_name: Option<String>,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            debug_trace: true,
            output_name: None,
        }
    }
}

/// A table that cannot be turned into valid code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenError {
    /// An operation name is not a C identifier.
    InvalidName {
        /// The offending name.
        name: String,
    },
    /// An opcode value does not fit its class's leading byte.
    ValueOutOfRange {
        /// Operation name.
        name: String,
        /// Operation class.
        class: OpClass,
        /// The offending value.
        value: u8,
    },
    /// Two different `(name, versions)` pairs map to the same jump label.
    LabelCollision {
        /// The shared label.
        label: String,
        /// Name of the first record.
        first_name: String,
        /// Versions of the first record.
        first_versions: VersionMask,
        /// Name of the second record.
        second_name: String,
        /// Versions of the second record.
        second_versions: VersionMask,
    },
    /// Two selected records decode from the same case byte.
    DuplicateCase {
        /// The case byte.
        byte: u8,
        /// Whether the clash is in the extended sub-opcode switch.
        extended: bool,
        /// Name of the first record.
        first: String,
        /// Name of the second record.
        second: String,
    },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name } => {
                write!(f, "operation name '{name}' is not a valid identifier")
            }
            Self::ValueOutOfRange { name, class, value } => write!(
                f,
                "operation {name}: value {value} out of range for {class} (max {})",
                class.max_value()
            ),
            Self::LabelCollision {
                label,
                first_name,
                first_versions,
                second_name,
                second_versions,
            } => write!(
                f,
                "label {label} produced by both {first_name} ({first_versions}) and \
                 {second_name} ({second_versions})"
            ),
            Self::DuplicateCase {
                byte,
                extended,
                first,
                second,
            } => {
                let switch = if *extended { "extended opcode" } else { "opcode" };
                write!(f, "{switch} 0x{byte:02x} decoded by both {first} and {second}")
            }
        }
    }
}

impl core::error::Error for GenError {}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Checks names, values, and label uniqueness across the whole table.
///
/// Labels are checked for every record, not only those a target selects, so that one table
/// produces collision-free output for any combination of targets.
pub fn validate(table: &OpTable) -> Result<(), GenError> {
    let mut labels: HashMap<String, &Operation> = HashMap::new();
    for op in table.ops() {
        if !is_identifier(&op.name) {
            return Err(GenError::InvalidName {
                name: op.name.clone(),
            });
        }
        if op.value > op.class.max_value() {
            return Err(GenError::ValueOutOfRange {
                name: op.name.clone(),
                class: op.class,
                value: op.value,
            });
        }
        let label = op.label();
        if let Some(prev) = labels.get(&label) {
            if prev.name != op.name || prev.versions != op.versions {
                return Err(GenError::LabelCollision {
                    label,
                    first_name: prev.name.clone(),
                    first_versions: prev.versions,
                    second_name: op.name.clone(),
                    second_versions: op.versions,
                });
            }
            continue;
        }
        labels.insert(label, op);
    }
    Ok(())
}

/// Produces dispatch and action code for one target.
#[derive(Debug)]
pub struct Generator<'a> {
    table: &'a OpTable,
    target: Target,
    options: GenOptions,
}

impl<'a> Generator<'a> {
    /// Validates `table` and prepares a generator for `target`.
    pub fn new(table: &'a OpTable, target: Target, options: GenOptions) -> Result<Self, GenError> {
        validate(table)?;
        Ok(Self {
            table,
            target,
            options,
        })
    }

    /// Returns `true` if `op` is generated for this target.
    ///
    /// Extended opcodes only exist in specific versions.
    #[must_use]
    pub fn selects(&self, op: &Operation) -> bool {
        match self.target {
            Target::Independent if op.class == OpClass::Extended => false,
            target => target.selects(op.versions),
        }
    }

    /// Emits the dispatch switch.
    pub fn dispatch(&self) -> Result<String, GenError> {
        self.check_cases()?;

        let mut out = String::new();
        emit::dispatch_header(&mut out, self.target);

        let mut extended: Vec<&Operation> = Vec::new();
        for op in self.table.ops() {
            if !self.selects(op) {
                debug!(name = %op.name, versions = %op.versions, target = %self.target, "skipping operation");
                emit::skipped(&mut out, op, self.target);
                continue;
            }
            if op.class == OpClass::Extended {
                extended.push(op);
                continue;
            }
            for p in plan(op) {
                debug!(name = %op.name, byte = p.lead.byte(), "emitting case");
                emit::case(&mut out, op, &p, Depth::Top, self.options.debug_trace);
            }
        }

        if !extended.is_empty() {
            emit::extended_open(&mut out);
            for op in extended {
                for p in plan(op) {
                    debug!(name = %op.name, byte = p.lead.byte(), "emitting extended case");
                    emit::case(&mut out, op, &p, Depth::Nested, self.options.debug_trace);
                }
            }
            emit::extended_close(&mut out);
        }

        emit::dispatch_footer(&mut out, self.target);
        Ok(out)
    }

    /// Emits one action block per distinct selected `(name, versions)` pair.
    ///
    /// `#line` numbers for [`GenOptions::output_name`] count from the start of this fragment.
    #[must_use]
    pub fn bodies(&self) -> String {
        let mut out = String::new();
        self.bodies_into(&mut out);
        out
    }

    /// Emits the dispatch switch followed by the action blocks.
    pub fn generate(&self) -> Result<String, GenError> {
        let mut out = self.dispatch()?;
        self.bodies_into(&mut out);
        Ok(out)
    }

    fn bodies_into(&self, out: &mut String) {
        let mut sync = self.options.output_name.as_deref().map(LineSync::new);
        let mut emitted: HashMap<(&str, VersionMask), &Operation> = HashMap::new();
        let mut stubs = 0_usize;
        for op in self.table.ops().iter().filter(|op| self.selects(op)) {
            if let Some(first) = emitted.get(&(op.name.as_str(), op.versions)) {
                if first.body != op.body {
                    warn!(
                        name = %op.name,
                        versions = %op.versions,
                        kept = %first.location,
                        dropped = %op.location,
                        "duplicate operation with a different body; keeping the first"
                    );
                }
                continue;
            }
            emitted.insert((op.name.as_str(), op.versions), op);
            if op.body.is_none() {
                debug!(name = %op.name, versions = %op.versions, "no action body; emitting stub");
                stubs += 1;
            }
            emit::action_block(out, op, sync.as_mut());
        }
        if stubs > 0 {
            warn!(stubs, target = %self.target, "operations without an action body");
        }
    }

    fn check_cases(&self) -> Result<(), GenError> {
        let mut top: HashMap<u8, &str> = HashMap::new();
        let mut ext: HashMap<u8, &str> = HashMap::new();
        for op in self.table.ops().iter().filter(|op| self.selects(op)) {
            for p in plan(op) {
                let (seen, byte, extended) = match p.lead {
                    Lead::Byte(b) => (&mut top, b, false),
                    Lead::Extended(b) => (&mut ext, b, true),
                };
                if let Some(first) = seen.insert(byte, &op.name) {
                    return Err(GenError::DuplicateCase {
                        byte,
                        extended,
                        first: first.to_owned(),
                        second: op.name.clone(),
                    });
                }
            }
        }
        if !ext.is_empty() {
            if let Some(first) = top.get(&EXTENDED_ESCAPE) {
                return Err(GenError::DuplicateCase {
                    byte: EXTENDED_ESCAPE,
                    extended: false,
                    first: (*first).to_owned(),
                    second: "extended opcode escape".to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Validates `table` and emits dispatch plus action blocks for `target`.
pub fn generate(table: &OpTable, target: Target, options: GenOptions) -> Result<String, GenError> {
    Generator::new(table, target, options)?.generate()
}
