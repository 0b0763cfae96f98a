//! # vbox-vm
//!
//! VirtualBox machine management layer.
//! Provides lifecycle control and configuration over the `VBoxManage`
//! command-line tool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vbox_vm::{BootDevice, Flags, VBox, VBoxConfig};
//!
//! # async fn example() -> vbox_vm::Result<()> {
//! let vbox = VBox::new(VBoxConfig::from_env())?;
//!
//! // Register a machine and configure it
//! let mut vm = vbox.create_machine("web01", None).await?;
//! let record = vm.record_mut();
//! record.set_os_type("Ubuntu_64");
//! record.set_cpus(2);
//! record.set_memory(2048);
//! record.set_flags(Flags::ACPI | Flags::IOAPIC | Flags::HW_VIRT_EX);
//! record.set_boot_order(vec![BootDevice::Dvd, BootDevice::Disk]);
//! vm.modify().await?;
//!
//! // Boot headless, then shut down through ACPI
//! vm.start().await?;
//! vm.refresh().await?;
//! vm.stop().await?;
//!
//! // Cleanup
//! vm.delete().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Lifecycle Management**: Start, save, pause, stop, power off, restart, reset and delete,
//!   each a no-op when the machine is already in a compatible state
//! - **Machine-readable Parsing**: `showvminfo --machinereadable` into a typed [`Machine`] record
//! - **Batch Configuration**: CPUs, memory, video RAM, feature flags and boot order in one `modifyvm`
//! - **Peripherals**: NAT port forwarding, NICs, storage controllers and media
//! - **Pluggable Backend**: Every invocation goes through [`CommandRunner`]

mod commands;
mod config;
mod devices;
mod error;
mod executor;
mod machine;
mod manager;
mod parser;
mod record;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::VBoxConfig;
pub use devices::{
    Chipset, DriveType, Nic, NicHardware, NicNetwork, PortForward, Protocol, StorageController,
    StorageMedium, SystemBus,
};
pub use error::{Result, VmError};
pub use executor::{CommandOutput, CommandRunner, VBoxManage};
pub use machine::VirtualMachine;
pub use manager::VBox;
pub use parser::{is_machine_not_found, parse_machine_info, parse_vm_list, VmListEntry};
pub use record::{Machine, MAX_BOOT_SLOTS};
pub use types::{BootDevice, Flags, MachineState};
