// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Table ordering.
//!
//! Ordering only affects the textual sequence of emitted cases and action blocks; dispatch is
//! keyed by literal opcode bytes, so any order generates equivalent code.

use crate::table::OpTable;

/// Which records take part in sorting.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Sort every record.
    #[default]
    All,
    /// Sort all but the final record, which stays last.
    ///
    /// Tables produced by the grammar front end carry a terminator record at the end; this keeps
    /// it in place while it still takes part in generation.
    ExcludeLast,
}

/// Sorts `table` by `(class, value)` under `policy`.
///
/// The sort is stable, so records with equal keys keep their table order.
pub fn order(table: &mut OpTable, policy: OrderPolicy) {
    let ops = table.ops_mut();
    let sorted = match policy {
        OrderPolicy::All => ops,
        OrderPolicy::ExcludeLast => {
            let n = ops.len().saturating_sub(1);
            &mut ops[..n]
        }
    };
    sorted.sort_by_key(|op| op.sort_key());
}
