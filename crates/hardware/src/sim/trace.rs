//! Trace discovery and parsing.
//!
//! One file per processor, named `<prefix>_<pid>.data`. Each line carries
//! two whitespace-separated tokens: a decimal opcode and a hexadecimal
//! value (optional `0x` prefix): `0 <addr>` load, `1 <addr>` store,
//! `2 <cycles>` non-memory work. Addresses are word addresses. Matching
//! files are sorted lexicographically and processor ids follow that order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::addr::WordAddr;
use crate::common::error::SimError;
use crate::core::processor::Instr;

/// Parses one trace file into an instruction stream.
///
/// # Errors
///
/// [`SimError::TraceIo`] when the file cannot be read and
/// [`SimError::TraceParse`] on the first malformed line (wrong field
/// count, bad opcode, bad hexadecimal value, or an address that does not
/// fit the word-address space).
pub fn parse_trace(path: &Path) -> Result<Vec<Instr>, SimError> {
    let text = fs::read_to_string(path).map_err(|source| SimError::TraceIo {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |line: usize, reason: String| SimError::TraceParse {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut program = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        let mut fields = raw.split_whitespace();
        let (Some(op), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(parse_error(
                line,
                "expected two whitespace-separated fields".to_owned(),
            ));
        };
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        let value = u64::from_str_radix(digits, 16)
            .map_err(|_| parse_error(line, format!("invalid hexadecimal value '{value}'")))?;
        let instr = match op {
            "0" | "1" => {
                let addr = u32::try_from(value).map_err(|_| {
                    parse_error(line, format!("address {value:#x} exceeds the address space"))
                })?;
                if op == "0" {
                    Instr::Read(WordAddr::new(addr))
                } else {
                    Instr::Write(WordAddr::new(addr))
                }
            }
            "2" => Instr::Other(value),
            other => {
                return Err(parse_error(
                    line,
                    format!("opcode '{other}' out of range (expected 0, 1 or 2)"),
                ));
            }
        };
        program.push(instr);
    }
    Ok(program)
}

/// Finds every `<prefix>_*.data` file under `dir`, sorted
/// lexicographically. The position in the returned list is the processor
/// id.
///
/// # Errors
///
/// [`SimError::TraceIo`] when the directory cannot be read and
/// [`SimError::NoTraceFiles`] when nothing matches.
pub fn discover_traces(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, SimError> {
    let entries = fs::read_dir(dir).map_err(|source| SimError::TraceIo {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SimError::TraceIo {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.strip_prefix(prefix).is_some_and(|rest| {
            rest.starts_with('_') && rest.ends_with(".data")
        }) {
            found.push(entry.path());
        }
    }
    if found.is_empty() {
        return Err(SimError::NoTraceFiles {
            dir: dir.to_path_buf(),
            prefix: prefix.to_owned(),
        });
    }
    found.sort();
    Ok(found)
}

/// Loads one program per trace for the prefix path `DIR/PREFIX`; index =
/// processor id.
///
/// # Errors
///
/// Propagates discovery and parse errors; see [`discover_traces`] and
/// [`parse_trace`].
pub fn load_programs(trace_prefix: &Path) -> Result<Vec<Vec<Instr>>, SimError> {
    let prefix = trace_prefix
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            SimError::Config(format!(
                "trace prefix '{}' has no file-name component",
                trace_prefix.display()
            ))
        })?;
    let dir = match trace_prefix.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    discover_traces(dir, prefix)?
        .iter()
        .map(|path| parse_trace(path))
        .collect()
}
