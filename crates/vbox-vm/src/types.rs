//! Machine-level value types: reported state, feature flags and boot devices.

use crate::error::VmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Render a boolean as the `on`/`off` token VBoxManage expects.
pub(crate) fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}

/// State of a machine as reported by `VMState`.
///
/// Values VBoxManage reports outside the five lifecycle states (for example
/// `starting` or `stuck`) are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MachineState {
    /// Machine is powered off
    #[default]
    Poweroff,
    /// Machine is running
    Running,
    /// Execution is paused in memory
    Paused,
    /// State was saved to disk
    Saved,
    /// Machine terminated abnormally
    Aborted,
    /// Any other reported value
    Unknown(String),
}

impl MachineState {
    /// Token as printed by VBoxManage.
    pub fn as_str(&self) -> &str {
        match self {
            MachineState::Poweroff => "poweroff",
            MachineState::Running => "running",
            MachineState::Paused => "paused",
            MachineState::Saved => "saved",
            MachineState::Aborted => "aborted",
            MachineState::Unknown(s) => s,
        }
    }

    /// Check if the machine is not executing (poweroff, saved or aborted).
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            MachineState::Poweroff | MachineState::Saved | MachineState::Aborted
        )
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MachineState {
    fn from(s: &str) -> Self {
        match s {
            "poweroff" => MachineState::Poweroff,
            "running" => MachineState::Running,
            "paused" => MachineState::Paused,
            "saved" => MachineState::Saved,
            "aborted" => MachineState::Aborted,
            other => MachineState::Unknown(other.to_string()),
        }
    }
}

impl From<String> for MachineState {
    fn from(s: String) -> Self {
        MachineState::from(s.as_str())
    }
}

impl From<MachineState> for String {
    fn from(state: MachineState) -> String {
        match state {
            MachineState::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Bit-set of machine feature toggles.
///
/// A value is replaced as a whole; there is no per-flag toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u32);

impl Flags {
    pub const ACPI: Flags = Flags(1 << 0);
    pub const IOAPIC: Flags = Flags(1 << 1);
    pub const RTC_USE_UTC: Flags = Flags(1 << 2);
    pub const CPU_HOTPLUG: Flags = Flags(1 << 3);
    pub const PAE: Flags = Flags(1 << 4);
    pub const LONG_MODE: Flags = Flags(1 << 5);
    pub const SYNTH_CPU: Flags = Flags(1 << 6);
    pub const HPET: Flags = Flags(1 << 7);
    pub const HW_VIRT_EX: Flags = Flags(1 << 8);
    pub const TRIPLE_FAULT_RESET: Flags = Flags(1 << 9);
    pub const NESTED_PAGING: Flags = Flags(1 << 10);
    pub const LARGE_PAGES: Flags = Flags(1 << 11);
    pub const VTX_VPID: Flags = Flags(1 << 12);
    pub const VTX_UX: Flags = Flags(1 << 13);
    pub const ACCELERATE_3D: Flags = Flags(1 << 14);

    /// Every flag paired with its `modifyvm` option, in command order.
    pub const OPTIONS: [(Flags, &'static str); 15] = [
        (Flags::ACPI, "--acpi"),
        (Flags::IOAPIC, "--ioapic"),
        (Flags::RTC_USE_UTC, "--rtcuseutc"),
        (Flags::CPU_HOTPLUG, "--cpuhotplug"),
        (Flags::PAE, "--pae"),
        (Flags::LONG_MODE, "--longmode"),
        (Flags::SYNTH_CPU, "--synthcpu"),
        (Flags::HPET, "--hpet"),
        (Flags::HW_VIRT_EX, "--hwvirtex"),
        (Flags::TRIPLE_FAULT_RESET, "--triplefaultreset"),
        (Flags::NESTED_PAGING, "--nestedpaging"),
        (Flags::LARGE_PAGES, "--largepages"),
        (Flags::VTX_VPID, "--vtxvpid"),
        (Flags::VTX_UX, "--vtxux"),
        (Flags::ACCELERATE_3D, "--accelerate3d"),
    ];

    /// No flags set.
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Build from raw bits, dropping unknown positions.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Flags(bits & 0x7fff)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// `on` if `flag` is set, `off` otherwise.
    pub fn get(self, flag: Flags) -> &'static str {
        on_off(self.contains(flag))
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Device class for a boot-order slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootDevice {
    None,
    Floppy,
    Dvd,
    Disk,
    Net,
}

impl BootDevice {
    /// Token as accepted by `--bootN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootDevice::None => "none",
            BootDevice::Floppy => "floppy",
            BootDevice::Dvd => "dvd",
            BootDevice::Disk => "disk",
            BootDevice::Net => "net",
        }
    }
}

impl fmt::Display for BootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootDevice {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BootDevice::None),
            "floppy" => Ok(BootDevice::Floppy),
            "dvd" => Ok(BootDevice::Dvd),
            "disk" => Ok(BootDevice::Disk),
            "net" => Ok(BootDevice::Net),
            other => Err(VmError::InvalidInput(format!(
                "unknown boot device: {other}"
            ))),
        }
    }
}
