// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON operation tables.
//!
//! The grammar front end that reads hand-written operation definitions hands its result over as
//! a JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "operations": [
//!     { "name": "add", "class": "binary", "value": 20, "versions": "all",
//!       "flags": ["store"], "body": "store(st, arg1 + arg2);",
//!       "location": { "file": "zcode.ops", "line": 42 } }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use zcode_dispatch::table::{OpClass, OpFlags, OpTable, Operation, SourceLocation};
use zcode_dispatch::version::VersionMask;

#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct TableFile {
    version: u32,
    operations: Vec<OperationSpec>,
}

#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
struct OperationSpec {
    name: String,
    class: String,
    value: u8,
    versions: VersionsSpec,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    location: Option<LocationSpec>,
}

#[derive(Deserialize, Clone)]
#[serde(untagged)]
enum VersionsSpec {
    Keyword(String),
    List(Vec<u32>),
}

#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
struct LocationSpec {
    file: String,
    line: u32,
}

fn parse_class(s: &str) -> Result<OpClass> {
    Ok(match s {
        "zero" => OpClass::Zero,
        "unary" => OpClass::Unary,
        "binary" => OpClass::Binary,
        "variable" => OpClass::Variable,
        "extended" => OpClass::Extended,
        other => bail!("unknown operation class '{other}'"),
    })
}

fn parse_flags(flags: &[String]) -> Result<OpFlags> {
    let mut out = OpFlags::default();
    for flag in flags {
        let slot = match flag.as_str() {
            "store" => &mut out.store,
            "branch" => &mut out.branch,
            "string" => &mut out.string,
            "double" => &mut out.double,
            "counts_operands" => &mut out.counts_operands,
            other => bail!("unknown flag '{other}'"),
        };
        if *slot {
            bail!("duplicate flag '{flag}'");
        }
        *slot = true;
    }
    Ok(out)
}

fn parse_versions(spec: &VersionsSpec) -> Result<VersionMask> {
    match spec {
        VersionsSpec::Keyword(k) if k == "all" => Ok(VersionMask::All),
        VersionsSpec::Keyword(other) => bail!("unknown versions keyword '{other}'"),
        VersionsSpec::List(vs) => Ok(VersionMask::from_versions(vs.iter().copied())?),
    }
}

impl TableFile {
    /// Parses a table document.
    pub(crate) fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts the document into an [`OpTable`], in document order.
    ///
    /// Bodies without an explicit location are attributed to line 1 of `source`.
    pub(crate) fn into_table(self, source: &str) -> Result<OpTable> {
        if self.version != 1 {
            bail!("unsupported table version {}", self.version);
        }
        let mut table = OpTable::new();
        for (i, spec) in self.operations.into_iter().enumerate() {
            let op = convert(spec, source)
                .with_context(|| format!("operation #{i} in {source}"))?;
            table.push(op);
        }
        Ok(table)
    }
}

fn convert(spec: OperationSpec, source: &str) -> Result<Operation> {
    let class = parse_class(&spec.class)?;
    let versions = parse_versions(&spec.versions)
        .with_context(|| format!("versions of {}", spec.name))?;
    let flags = parse_flags(&spec.flags).with_context(|| format!("flags of {}", spec.name))?;
    let location = match spec.location {
        Some(LocationSpec { line: 0, .. }) => {
            bail!("location of {}: line numbers start at 1", spec.name)
        }
        Some(LocationSpec { file, line }) => SourceLocation::new(file, line),
        None => SourceLocation::new(source, 1),
    };
    let mut op = Operation::new(spec.name, class, spec.value, versions).with_flags(flags);
    op.location = location;
    op.body = spec.body;
    Ok(op)
}

/// Reads and converts the table at `path`.
pub(crate) fn load(path: &Path) -> Result<OpTable> {
    let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let file = TableFile::from_json(&json).with_context(|| format!("parse {}", path.display()))?;
    file.into_table(&path.display().to_string())
}
