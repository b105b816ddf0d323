// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `zcode_dispatch`: generates version-specialised Z-machine instruction dispatchers.
//!
//! An [`OpTable`](table::OpTable) lists every operation variant: its encoding class, opcode
//! value, applicable versions, decode flags, and hand-written action code. For a chosen
//! [`Target`](version::Target) the generator emits a C fragment made of
//!
//! - one `switch (instr)` that decodes every selected instruction shape (operands, store byte,
//!   branch descriptor, packed text) and jumps to its action label, and
//! - one guarded, labeled action block per distinct operation variant.
//!
//! Decoding is planned structurally per instruction class (see [`decode`]) and then formatted,
//! so the byte layouts can be tested without comparing generated text.
//!
//! ## Example
//!
//! ```
//! use zcode_dispatch::generate::{GenOptions, generate};
//! use zcode_dispatch::order::{OrderPolicy, order};
//! use zcode_dispatch::table::{OpClass, OpFlags, OpTable, Operation, SourceLocation};
//! use zcode_dispatch::version::{Target, VersionMask};
//!
//! let mut table = OpTable::new();
//! table.push(
//!     Operation::new("add", OpClass::Binary, 20, VersionMask::All)
//!         .with_flags(OpFlags { store: true, ..OpFlags::default() })
//!         .with_body("store(st, arg1 + arg2);", SourceLocation::new("zcode.ops", 12)),
//! );
//! table.push(Operation::new("rtrue", OpClass::Zero, 0, VersionMask::All));
//! order(&mut table, OrderPolicy::All);
//!
//! let c = generate(&table, Target::Version(5), GenOptions::default())?;
//! assert!(c.contains("goto op_add;"));
//! assert!(c.contains("  op_rtrue:\n"));
//! # Ok::<(), zcode_dispatch::generate::GenError>(())
//! ```

pub mod decode;
pub(crate) mod emit;
pub mod generate;
pub mod order;
pub mod table;
pub mod version;
