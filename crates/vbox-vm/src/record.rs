//! In-memory record of a machine's configuration and reported state.

use crate::error::{Result, VmError};
use crate::types::{BootDevice, Flags, MachineState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Maximum number of boot-order slots VBoxManage accepts.
pub const MAX_BOOT_SLOTS: usize = 4;

/// Snapshot of a registered machine.
///
/// Populated from `showvminfo --machinereadable` and edited through setters
/// before being applied with [`VirtualMachine::modify`](crate::VirtualMachine::modify).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    name: String,
    uuid: String,
    state: MachineState,
    cpus: u32,
    /// Main memory in MB
    memory: u32,
    /// Video memory in MB
    vram: u32,
    cfg_file: PathBuf,
    base_folder: PathBuf,
    os_type: String,
    flags: Flags,
    boot_order: Vec<BootDevice>,
}

impl Machine {
    /// Empty record addressed by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Identifier used to address the machine: the name, else the UUID.
    pub fn id(&self) -> &str {
        if self.name.is_empty() {
            &self.uuid
        } else {
            &self.name
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn cpus(&self) -> u32 {
        self.cpus
    }

    pub fn memory(&self) -> u32 {
        self.memory
    }

    pub fn vram(&self) -> u32 {
        self.vram
    }

    pub fn cfg_file(&self) -> &Path {
        &self.cfg_file
    }

    /// Directory containing the settings file.
    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    pub fn os_type(&self) -> &str {
        &self.os_type
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Stored boot order; only the first [`MAX_BOOT_SLOTS`] are applied.
    pub fn boot_order(&self) -> &[BootDevice] {
        &self.boot_order
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the UUID after checking it is well formed.
    ///
    /// # Errors
    /// Returns `InvalidUuid` if `uuid` does not parse as a UUID.
    pub fn set_uuid(&mut self, uuid: &str) -> Result<()> {
        let parsed =
            Uuid::parse_str(uuid).map_err(|e| VmError::InvalidUuid(format!("{uuid}: {e}")))?;
        self.uuid = parsed.hyphenated().to_string();
        Ok(())
    }

    pub fn set_state(&mut self, state: MachineState) {
        self.state = state;
    }

    pub fn set_cpus(&mut self, cpus: u32) {
        self.cpus = cpus;
    }

    pub fn set_memory(&mut self, memory: u32) {
        self.memory = memory;
    }

    pub fn set_vram(&mut self, vram: u32) {
        self.vram = vram;
    }

    /// Set the settings file; the base folder follows its parent.
    pub fn set_cfg_file(&mut self, cfg_file: impl Into<PathBuf>) {
        self.cfg_file = cfg_file.into();
        self.base_folder = self
            .cfg_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
    }

    pub fn set_os_type(&mut self, os_type: impl Into<String>) {
        self.os_type = os_type.into();
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn set_boot_order(&mut self, boot_order: Vec<BootDevice>) {
        self.boot_order = boot_order;
    }

    /// Raw UUID from trusted tool output.
    pub(crate) fn set_uuid_unchecked(&mut self, uuid: impl Into<String>) {
        self.uuid = uuid.into();
    }
}
