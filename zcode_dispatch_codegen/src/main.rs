// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Command-line driver for `zcode_dispatch`.\n\n\
          Reads a JSON operation table and writes the C dispatcher fragment for one interpreter \
          version, or for the version-independent subset when the selector is `-1`.\n"]

mod table_file;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use zcode_dispatch::generate::{GenOptions, generate};
use zcode_dispatch::order::{OrderPolicy, order};
use zcode_dispatch::version::Target;

const USAGE: &str = "usage: zcode_dispatch_codegen <output.c> <version | -1> <table.json>";

#[derive(Debug)]
struct Invocation {
    output: PathBuf,
    target: Target,
    table: PathBuf,
}

/// Why a run failed; each kind maps to its own exit status.
#[derive(Debug)]
enum Failure {
    Usage(anyhow::Error),
    Input(anyhow::Error),
    Generate(anyhow::Error),
    Output(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Input(_) => 3,
            Self::Generate(_) => 4,
            Self::Output(_) => 5,
        }
    }

    fn error(&self) -> &anyhow::Error {
        match self {
            Self::Usage(e) | Self::Input(e) | Self::Generate(e) | Self::Output(e) => e,
        }
    }
}

fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = OsString>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let [output, selector, table] = <[OsString; 3]>::try_from(args)
        .map_err(|args| anyhow!("expected 3 arguments, got {}", args.len()))?;
    let selector = selector
        .to_str()
        .ok_or_else(|| anyhow!("version selector is not valid UTF-8"))?;
    let selector: i64 = selector
        .trim()
        .parse()
        .with_context(|| format!("invalid version selector '{selector}'"))?;
    let target = Target::from_selector(selector)?;
    Ok(Invocation {
        output: PathBuf::from(output),
        target,
        table: PathBuf::from(table),
    })
}

/// Loads, orders, and renders the table at `table_path` for `target`.
///
/// `output_name` is the name `#line` directives use for the generated file itself.
fn render(table_path: &Path, target: Target, output_name: &str) -> Result<String, Failure> {
    let mut table = table_file::load(table_path).map_err(Failure::Input)?;
    order(&mut table, OrderPolicy::All);
    debug!(operations = table.len(), "table loaded");

    let options = GenOptions {
        output_name: Some(output_name.to_owned()),
        ..GenOptions::default()
    };
    generate(&table, target, options)
        .with_context(|| format!("generate {target} from {}", table_path.display()))
        .map_err(Failure::Generate)
}

/// Writes `rendered` to `path`, removing the file again if the write does not complete.
fn write_output(path: &Path, rendered: &str) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    if let Err(err) = file.write_all(rendered.as_bytes()) {
        drop(file);
        if let Err(rm) = fs::remove_file(path) {
            debug!(path = %path.display(), error = %rm, "could not remove partial output");
        }
        return Err(err).with_context(|| format!("write {}", path.display()));
    }
    Ok(())
}

fn run<I>(args: I) -> Result<(), Failure>
where
    I: IntoIterator<Item = OsString>,
{
    let invocation = parse_args(args).map_err(Failure::Usage)?;
    let output_name = invocation.output.display().to_string();
    let rendered = render(&invocation.table, invocation.target, &output_name)?;
    write_output(&invocation.output, &rendered).map_err(Failure::Output)?;
    info!(
        target_versions = %invocation.target,
        output = %invocation.output.display(),
        bytes = rendered.len(),
        "dispatcher written"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    match run(std::env::args_os().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {:#}", failure.error());
            if matches!(failure, Failure::Usage(_)) {
                eprintln!("{USAGE}");
            }
            ExitCode::from(failure.exit_code())
        }
    }
}
