//! Parsers for VBoxManage text output.
//!
//! `showvminfo --machinereadable` prints one `key=value` pair per line, with
//! either side optionally double-quoted. `list vms` prints `"name" {uuid}`.

use crate::error::{Result, VmError};
use crate::record::Machine;

/// Diagnostic VBoxManage prints when a machine name or UUID is unknown.
const MACHINE_NOT_FOUND: &str = "Could not find a registered machine";

/// One line of `list vms` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmListEntry {
    /// Machine name
    pub name: String,
    /// Machine UUID, without braces
    pub uuid: String,
}

/// Check whether captured stderr carries the unknown-machine diagnostic.
pub fn is_machine_not_found(stderr: &str) -> bool {
    stderr.contains(MACHINE_NOT_FOUND)
}

/// Split a `key=value` line, removing optional quotes on either side.
///
/// A quoted key may itself contain `=`.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, raw) = match line.strip_prefix('"').and_then(|rest| {
        rest.find("\"=")
            .map(|end| (&rest[..end], &rest[end + 2..]))
    }) {
        Some(pair) => pair,
        None => line.split_once('=')?,
    };

    if key.is_empty() {
        return None;
    }

    let value = match raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(unquoted) => unquoted,
        None => raw,
    };
    Some((key, value))
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value.parse().map_err(|source| VmError::Parse {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Build a [`Machine`] from `showvminfo --machinereadable` output.
///
/// Only `name`, `UUID`, `VMState`, `memory`, `cpus`, `vram` and `CfgFile`
/// are read; every other line is ignored.
///
/// # Errors
/// Returns `Parse` if `memory`, `cpus` or `vram` is not an unsigned integer.
pub fn parse_machine_info(output: &str) -> Result<Machine> {
    let mut machine = Machine::default();

    for (key, value) in output.lines().filter_map(split_key_value) {
        match key {
            "name" => machine.set_name(value),
            "UUID" => machine.set_uuid_unchecked(value),
            "VMState" => machine.set_state(value.into()),
            "memory" => machine.set_memory(parse_number(key, value)?),
            "cpus" => machine.set_cpus(parse_number(key, value)?),
            "vram" => machine.set_vram(parse_number(key, value)?),
            "CfgFile" => machine.set_cfg_file(value),
            _ => {}
        }
    }

    Ok(machine)
}

fn parse_list_line(line: &str) -> Option<VmListEntry> {
    let (name, uuid) = line.trim().rsplit_once(" {")?;
    let name = name.strip_prefix('"')?.strip_suffix('"')?;
    let uuid = uuid.strip_suffix('}')?;

    if name.is_empty()
        || uuid.is_empty()
        || !uuid.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
    {
        return None;
    }

    Some(VmListEntry {
        name: name.to_string(),
        uuid: uuid.to_string(),
    })
}

/// Parse `list vms` output; lines that do not match are skipped.
pub fn parse_vm_list(output: &str) -> Vec<VmListEntry> {
    output.lines().filter_map(parse_list_line).collect()
}
