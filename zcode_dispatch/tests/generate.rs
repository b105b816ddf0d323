// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "integration test crate")]

use zcode_dispatch::decode::BranchDescriptor;
use zcode_dispatch::generate::{GenOptions, Generator, generate};
use zcode_dispatch::order::{OrderPolicy, order};
use zcode_dispatch::table::{OpClass, OpFlags, OpTable, Operation, SourceLocation};
use zcode_dispatch::version::{Target, VersionMask};

fn only(vs: &[u32]) -> VersionMask {
    VersionMask::from_versions(vs.iter().copied()).unwrap()
}

fn quiet() -> GenOptions {
    GenOptions {
        debug_trace: false,
        ..GenOptions::default()
    }
}

/// `nop` for versions 3 and 5, `add` (store) for every version, `call` (branch) for version 5.
fn three_record_table() -> OpTable {
    let mut t = OpTable::new();
    t.push(
        Operation::new("call", OpClass::Variable, 0, only(&[5])).with_flags(OpFlags {
            branch: true,
            ..OpFlags::default()
        }),
    );
    t.push(
        Operation::new("add", OpClass::Binary, 20, VersionMask::All)
            .with_flags(OpFlags {
                store: true,
                ..OpFlags::default()
            })
            .with_body("store(st, arg1 + arg2);", SourceLocation::new("zcode.ops", 7)),
    );
    t.push(Operation::new("nop", OpClass::Zero, 4, only(&[3, 5])));
    order(&mut t, OrderPolicy::All);
    t
}

#[test]
fn round_trip_for_version_5() {
    let t = three_record_table();
    let out = generate(&t, Target::Version(5), quiet()).unwrap();

    // nop: one case on 0xB4 jumping to the suffixed label.
    assert!(out.contains("    case 0xb4: /* nop */\n      pc += 1;\n      goto op_nop_35;\n"));

    // add: four long-form cases, all to the unsuffixed label, plus the variable form.
    for byte in ["0x14", "0x34", "0x54", "0x74"] {
        assert!(out.contains(&format!("    case {byte}: /* add */\n")), "{byte}");
    }
    assert!(out.contains("    case 0xd4: /* add - variable form */\n"));
    assert_eq!(out.matches("goto op_add;").count(), 5);
    assert!(out.contains(
        "      arg1 = GetCode(pc+1);\n      arg2 = GetVar(GetCode(pc+2));\n      st = GetCode(pc+3);\n      pc += 4;\n      goto op_add;\n"
    ));

    // call: a single variable-form case with branch decode.
    assert!(out.contains(
        "    case 0xe0: /* call */\n      padding = zmachine_decode_varop(stack, &GetCode(pc+1), &argblock);\n      tmp = GetCode(pc+2+padding);\n"
    ));
    assert!(out.contains("      pc += 3+padding;\n      goto op_call_5;\n"));

    // No extended sub-switch, fatal default arm.
    assert!(!out.contains("Extended ops"));
    assert!(out.contains("    default:\n      zmachine_fatal(\"Unknown opcode: %x\", GetCode(pc));\n    }\n"));

    // Action blocks follow the switch.
    let switch_end = out.find("    default:\n").unwrap();
    let add_block = out.find("  op_add:\n").unwrap();
    assert!(add_block > switch_end);
    assert!(out.contains("#line 7 \"zcode.ops\"\nstore(st, arg1 + arg2);\n    }\n    goto loop;\n"));
    assert!(out.contains("  op_nop_35:\n    zmachine_warning(\"nop not implemented\");\n"));
    assert!(out.contains("  op_call_5:\n    zmachine_warning(\"call not implemented\");\n"));
}

#[test]
fn excluded_record_is_only_a_comment() {
    let t = three_record_table();
    let out = generate(&t, Target::Version(4), quiet()).unwrap();
    assert!(out.contains("    /* nop not in version 4 */\n"));
    assert!(out.contains("    /* call not in version 4 */\n"));
    assert!(!out.contains("case 0xb4"));
    assert!(!out.contains("case 0xe0"));
    assert!(!out.contains("op_nop_35"));
    assert!(!out.contains("op_call_5"));
    assert!(out.contains("  op_add:\n"));
}

#[test]
fn version_3_keeps_nop_and_add() {
    let t = three_record_table();
    let g = Generator::new(&t, Target::Version(3), quiet()).unwrap();
    let dispatch = g.dispatch().unwrap();
    assert!(dispatch.contains("goto op_nop_35;"));
    assert!(dispatch.contains("goto op_add;"));
    assert!(!dispatch.contains("goto op_call_5;"));
    let bodies = g.bodies();
    assert!(bodies.starts_with("#ifndef ZCODE_OP_nop_35\n"));
}

#[test]
fn output_for_two_versions_shares_guards() {
    let t = three_record_table();
    let v3 = generate(&t, Target::Version(3), quiet()).unwrap();
    let v5 = generate(&t, Target::Version(5), quiet()).unwrap();
    // Both passes guard the shared blocks with identical identifiers, so a unit that includes
    // both defines each label once.
    for guard in ["#ifndef ZCODE_OP_add\n", "#ifndef ZCODE_OP_nop_35\n"] {
        assert!(v3.contains(guard));
        assert!(v5.contains(guard));
    }
}

#[test]
fn independent_build_defers_unknown_opcodes() {
    let t = three_record_table();
    let out = generate(&t, Target::Independent, quiet()).unwrap();
    assert!(out.contains("generated for all versions"));
    assert!(out.contains("goto op_add;"));
    assert!(out.contains("    /* nop is version-specific */\n"));
    assert!(out.contains("    default:\n      goto version;\n    }\n"));
}

#[test]
fn terminator_record_stays_last_but_is_generated() {
    let mut t = OpTable::new();
    t.push(Operation::new("quit", OpClass::Zero, 10, VersionMask::All));
    t.push(Operation::new("rtrue", OpClass::Zero, 0, VersionMask::All));
    t.push(Operation::new("je", OpClass::Binary, 1, VersionMask::All));
    t.push(Operation::new("rfalse", OpClass::Zero, 1, VersionMask::All));
    order(&mut t, OrderPolicy::ExcludeLast);

    let names: Vec<&str> = t.ops().iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, ["rtrue", "quit", "je", "rfalse"]);

    let out = generate(&t, Target::Version(5), quiet()).unwrap();
    let je = out.find("/* je */").unwrap();
    let rfalse = out.find("/* rfalse */").unwrap();
    assert!(rfalse > je);
    assert!(out.contains("  op_rfalse:\n"));
}

#[test]
fn debug_trace_is_on_by_default() {
    let t = three_record_table();
    let out = generate(&t, Target::Version(5), GenOptions::default()).unwrap();
    assert!(out.contains("#ifdef DEBUG\nprintf(\"add (var form)\\n\");\n#endif\n"));
}

#[test]
fn branch_descriptor_wire_values() {
    // (bytes, offset, negate, bytes consumed)
    let cases: [(&[u8], i16, bool, usize); 5] = [
        (&[0x40], 0, false, 1),
        (&[0x9F, 0x12], 7954, true, 2),
        (&[0x60], 32, false, 1),
        (&[0x3F, 0xFF], -1, false, 2),
        (&[0xA0, 0x00], -8192, true, 2),
    ];
    for (bytes, offset, negate, used) in cases {
        let (d, n) = BranchDescriptor::decode(bytes).unwrap();
        assert_eq!((d.offset, d.negate, n), (offset, negate, used), "{bytes:02x?}");
    }
}

/// The branch block must read the descriptor where the trailing bytes put it, and count the
/// second byte of the long form (the decoder's `consumed == 2`) into `padding`.
#[test]
fn emitted_branch_blocks_read_descriptor_in_place() {
    let mut t = OpTable::new();
    // Fixed position: 1OP large constant, store then branch.
    t.push(
        Operation::new("get_sibling", OpClass::Unary, 1, VersionMask::All).with_flags(OpFlags {
            store: true,
            branch: true,
            ..OpFlags::default()
        }),
    );
    // Position after the operand-type helper.
    t.push(
        Operation::new("scan_table", OpClass::Variable, 23, only(&[5])).with_flags(OpFlags {
            store: true,
            branch: true,
            ..OpFlags::default()
        }),
    );
    let out = generate(&t, Target::Version(5), quiet()).unwrap();

    let fixed = "    case 0x81: /* get_sibling */\n\
                 \x20     arg1 = (GetCode(pc+1)<<8)|GetCode(pc+2);\n\
                 \x20     st = GetCode(pc+3);\n\
                 \x20     tmp = GetCode(pc+4);\n\
                 \x20     branch = tmp&0x3f;\n\
                 \x20     padding = 0;\n\
                 \x20     if (!(tmp&0x40))\n\
                 \x20       {\n\
                 \x20         padding = 1;\n\
                 \x20         if (branch&0x20)\n\
                 \x20           branch -= 64;\n\
                 \x20         branch <<= 8;\n\
                 \x20         branch |= GetCode(pc+5);\n\
                 \x20       }\n\
                 \x20     negate = tmp&0x80;\n\
                 \x20     pc += 5+padding;\n\
                 \x20     goto op_get_sibling;\n\n";
    assert!(out.contains(fixed), "{out}");

    let padded = "    case 0xf7: /* scan_table */\n\
                  \x20     padding = zmachine_decode_varop(stack, &GetCode(pc+1), &argblock);\n\
                  \x20     st = GetCode(pc+2+padding);\n\
                  \x20     tmp = GetCode(pc+3+padding);\n\
                  \x20     branch = tmp&0x3f;\n\
                  \x20     if (!(tmp&0x40))\n\
                  \x20       {\n\
                  \x20         padding++;\n\
                  \x20         if (branch&0x20)\n\
                  \x20           branch -= 64;\n\
                  \x20         branch <<= 8;\n\
                  \x20         branch |= GetCode(pc+3+padding);\n\
                  \x20       }\n\
                  \x20     negate = tmp&0x80;\n\
                  \x20     pc += 4+padding;\n\
                  \x20     goto op_scan_table_5;\n\n";
    assert!(out.contains(padded), "{out}");
}

#[test]
fn output_name_keeps_line_directives_consistent() {
    let mut t = three_record_table();
    t.push(
        Operation::new("piracy", OpClass::Zero, 15, only(&[5]))
            .with_body("dobranch(1);", SourceLocation::new("zcode.ops", 0)),
    );
    let options = GenOptions {
        output_name: Some("interp5.c".to_owned()),
        ..quiet()
    };
    let out = generate(&t, Target::Version(5), options).unwrap();
    let mut resyncs = 0;
    for (i, line) in out.lines().enumerate() {
        if let Some(rest) = line.strip_prefix("#line ") {
            let (n, file) = rest.split_once(' ').unwrap();
            let n: usize = n.parse().unwrap();
            assert!(n >= 1, "{line}");
            if file == "\"interp5.c\"" {
                assert_eq!(n, i + 2, "{line}");
                resyncs += 1;
            }
        }
    }
    assert_eq!(resyncs, 2);
    assert!(out.contains("#line 7 \"zcode.ops\"\nstore(st, arg1 + arg2);\n    }\n#line "));
    assert!(out.contains("#line 1 \"zcode.ops\"\ndobranch(1);\n"));
}
