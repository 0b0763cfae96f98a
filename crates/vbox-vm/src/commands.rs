//! Argument vectors for VBoxManage invocations.
//!
//! Builders are pure so the exact tokens can be checked without a tool.

use crate::devices::{Nic, NicNetwork, PortForward, StorageController, StorageMedium};
use crate::record::{Machine, MAX_BOOT_SLOTS};
use crate::types::{on_off, Flags};
use std::path::Path;

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn show_vm_info(id: &str) -> Vec<String> {
    args(["showvminfo", id, "--machinereadable"])
}

pub(crate) fn list_vms() -> Vec<String> {
    args(["list", "vms"])
}

pub(crate) fn create_vm(name: &str, base_folder: Option<&Path>) -> Vec<String> {
    let mut cmd = args(["createvm", "--name", name, "--register"]);
    if let Some(folder) = base_folder {
        cmd.push("--basefolder".into());
        cmd.push(folder.to_string_lossy().into_owned());
    }
    cmd
}

/// `controlvm <id> <action...>`
pub(crate) fn control_vm(id: &str, action: &[&str]) -> Vec<String> {
    let mut cmd = args(["controlvm", id]);
    cmd.extend(action.iter().map(|s| s.to_string()));
    cmd
}

pub(crate) fn start_headless(id: &str) -> Vec<String> {
    args(["startvm", id, "--type", "headless"])
}

pub(crate) fn unregister_delete(id: &str) -> Vec<String> {
    args(["unregistervm", id, "--delete"])
}

/// Batch `modifyvm` applying every setting held by the record.
///
/// Firmware is pinned to BIOS with the boot logo and boot menu disabled.
/// Only the first four boot devices become `--boot1`..`--boot4`.
pub fn modify_vm(machine: &Machine) -> Vec<String> {
    let mut cmd = args([
        "modifyvm",
        machine.id(),
        "--firmware",
        "bios",
        "--bioslogofadein",
        "off",
        "--bioslogofadeout",
        "off",
        "--bioslogodisplaytime",
        "0",
        "--biosbootmenu",
        "disabled",
        "--ostype",
        machine.os_type(),
    ]);

    for (option, value) in [
        ("--cpus", machine.cpus()),
        ("--memory", machine.memory()),
        ("--vram", machine.vram()),
    ] {
        cmd.push(option.into());
        cmd.push(value.to_string());
    }

    let flags: Flags = machine.flags();
    for (flag, option) in Flags::OPTIONS {
        cmd.push(option.into());
        cmd.push(flags.get(flag).into());
    }

    for (slot, device) in machine.boot_order().iter().take(MAX_BOOT_SLOTS).enumerate() {
        cmd.push(format!("--boot{}", slot + 1));
        cmd.push(device.as_str().into());
    }

    cmd
}

pub fn add_nat_port_forward(id: &str, nic: u32, name: &str, rule: &PortForward) -> Vec<String> {
    vec![
        "controlvm".into(),
        id.into(),
        format!("natpf{nic}"),
        format!("{name},{rule}"),
    ]
}

pub fn delete_nat_port_forward(id: &str, nic: u32, name: &str) -> Vec<String> {
    vec![
        "controlvm".into(),
        id.into(),
        format!("natpf{nic}"),
        "delete".into(),
        name.into(),
    ]
}

/// `modifyvm` for the n-th NIC; the cable is always connected.
pub fn set_nic(id: &str, n: u32, nic: &Nic) -> Vec<String> {
    let mut cmd = vec![
        "modifyvm".into(),
        id.into(),
        format!("--nic{n}"),
        nic.network.as_str().into(),
        format!("--nictype{n}"),
        nic.hardware.as_str().into(),
        format!("--cableconnected{n}"),
        "on".into(),
    ];

    if nic.network == NicNetwork::Hostonly {
        cmd.push(format!("--hostonlyadapter{n}"));
        cmd.push(nic.hostonly_adapter.clone().unwrap_or_default());
    }
    cmd
}

pub fn add_storage_controller(id: &str, name: &str, ctl: &StorageController) -> Vec<String> {
    let mut cmd = args(["storagectl", id, "--name", name]);
    if let Some(bus) = ctl.bus {
        cmd.push("--add".into());
        cmd.push(bus.as_str().into());
    }
    if ctl.ports > 0 {
        cmd.push("--portcount".into());
        cmd.push(ctl.ports.to_string());
    }
    if let Some(chipset) = ctl.chipset {
        cmd.push("--controller".into());
        cmd.push(chipset.as_str().into());
    }
    cmd.push("--hostiocache".into());
    cmd.push(on_off(ctl.host_io_cache).into());
    cmd.push("--bootable".into());
    cmd.push(on_off(ctl.bootable).into());
    cmd
}

pub fn delete_storage_controller(id: &str, name: &str) -> Vec<String> {
    args(["storagectl", id, "--name", name, "--remove"])
}

pub fn attach_storage(id: &str, controller: &str, medium: &StorageMedium) -> Vec<String> {
    vec![
        "storageattach".into(),
        id.into(),
        "--storagectl".into(),
        controller.into(),
        "--port".into(),
        medium.port.to_string(),
        "--device".into(),
        medium.device.to_string(),
        "--type".into(),
        medium.drive_type.as_str().into(),
        "--medium".into(),
        medium.medium.clone(),
    ]
}
