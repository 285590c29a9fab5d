//! Walks `tests/fixtures/*.stone` and checks each file against its header:
//!
//! ```text
//! // expect: ok
//! // expect: error unresolved_type
//! // bind: Todo
//! ```
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use colored::Colorize;
use concrete_stone::{CompileError, Module, compile};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^//\s*(expect|bind):\s*(.+?)\s*$").unwrap_or_else(|e| panic!("header regex: {e}"))
});

#[derive(Debug, PartialEq)]
enum Expect {
    Ok,
    Error(String),
}

struct Fixture {
    path: PathBuf,
    source: String,
    expect: Expect,
    bind: Option<String>,
}

impl Fixture {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut expect = None;
        let mut bind = None;
        for caps in HEADER.captures_iter(&source) {
            match (&caps[1], &caps[2]) {
                ("expect", "ok") => expect = Some(Expect::Ok),
                ("expect", rest) => match rest.strip_prefix("error") {
                    Some(code) => expect = Some(Expect::Error(code.trim().to_string())),
                    None => bail!("{}: bad expect header `{rest}`", path.display()),
                },
                ("bind", name) => bind = Some(name.to_string()),
                _ => {}
            }
        }
        let Some(expect) = expect else {
            bail!("{}: missing `// expect:` header", path.display());
        };
        Ok(Self { path: path.to_path_buf(), source, expect, bind })
    }

    fn run(&self) -> Result<(), CompileError> {
        let graph = compile(&self.source)?;
        if let Some(name) = &self.bind {
            Module::bind(&graph, name)?.build()?;
        }
        Ok(())
    }

    /// `None` on success, otherwise what went wrong.
    fn check(&self) -> Option<String> {
        match (&self.expect, self.run()) {
            (Expect::Ok, Ok(())) => None,
            (Expect::Ok, Err(error)) => Some(format!("expected ok, got {}: {error}", error.code())),
            (Expect::Error(code), Err(error)) if error.code() == code => None,
            (Expect::Error(code), Err(error)) => Some(format!("expected {code}, got {}: {error}", error.code())),
            (Expect::Error(code), Ok(())) => Some(format!("expected {code}, got ok")),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| "tests/fixtures".to_string());
    let pattern = format!("{root}/*.stone");
    let mut failures = 0;
    let mut total = 0;

    for entry in glob::glob(&pattern).with_context(|| format!("bad pattern {pattern}"))? {
        let fixture = Fixture::load(&entry?)?;
        total += 1;
        match fixture.check() {
            None => eprintln!("{} {}", "pass".green().bold(), fixture.path.display()),
            Some(reason) => {
                failures += 1;
                eprintln!("{} {}: {reason}", "FAIL".red().bold(), fixture.path.display());
            }
        }
    }

    if total == 0 {
        bail!("no fixtures under {root}");
    }
    eprintln!("{total} fixtures, {failures} failed");
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
