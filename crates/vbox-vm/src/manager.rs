//! Entry point for querying, listing and registering machines.

use crate::commands;
use crate::config::VBoxConfig;
use crate::error::{Result, VmError};
use crate::executor::{CommandRunner, VBoxManage};
use crate::machine::VirtualMachine;
use crate::parser::{self, VmListEntry};
use crate::record::Machine;
use std::path::Path;
use std::sync::Arc;

/// Query one machine with `showvminfo --machinereadable`.
///
/// The unknown-machine diagnostic on stderr becomes `NotFound`; any other
/// failure is returned unchanged.
pub(crate) async fn query_machine(runner: &dyn CommandRunner, id: &str) -> Result<Machine> {
    let output = runner
        .run(&commands::show_vm_info(id))
        .await
        .map_err(|e| match e {
            VmError::Command { ref stderr, .. } if parser::is_machine_not_found(stderr) => {
                VmError::NotFound(id.to_string())
            }
            other => other,
        })?;

    parser::parse_machine_info(&output.stdout)
}

/// VirtualBox host accessed through VBoxManage.
///
/// Machines are looked up by name or UUID and handed out as
/// [`VirtualMachine`] handles sharing this host's command runner.
#[derive(Clone)]
pub struct VBox {
    runner: Arc<dyn CommandRunner>,
    config: VBoxConfig,
}

impl std::fmt::Debug for VBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VBox")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VBox {
    /// Create a host backed by the real VBoxManage binary.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: VBoxConfig) -> Result<Self> {
        let runner = Arc::new(VBoxManage::from_config(&config));
        Self::with_runner(runner, config)
    }

    /// Create a host configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(VBoxConfig::from_env())
    }

    /// Create a host with a custom command runner.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_runner(runner: Arc<dyn CommandRunner>, config: VBoxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { runner, config })
    }

    /// Get the active configuration.
    pub fn config(&self) -> &VBoxConfig {
        &self.config
    }

    fn handle(&self, record: Machine) -> VirtualMachine {
        VirtualMachine::new(record, Arc::clone(&self.runner), &self.config)
    }

    /// Find a machine by name or UUID.
    ///
    /// # Errors
    /// Returns `NotFound` if no such machine is registered.
    pub async fn get_machine(&self, id: &str) -> Result<VirtualMachine> {
        if id.is_empty() {
            return Err(VmError::InvalidInput("machine identifier is empty".into()));
        }
        let record = query_machine(self.runner.as_ref(), id).await?;
        Ok(self.handle(record))
    }

    /// List names and UUIDs of all registered machines without querying each.
    pub async fn list_registered(&self) -> Result<Vec<VmListEntry>> {
        let output = self.runner.run(&commands::list_vms()).await?;
        Ok(parser::parse_vm_list(&output.stdout))
    }

    /// List all registered machines with full details.
    ///
    /// Each listed machine is queried individually; any failure aborts the
    /// whole listing.
    pub async fn list_machines(&self) -> Result<Vec<VirtualMachine>> {
        let entries = self.list_registered().await?;
        tracing::debug!(count = entries.len(), "Listed registered VMs");

        let mut machines = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = query_machine(self.runner.as_ref(), &entry.uuid).await?;
            machines.push(self.handle(record));
        }
        Ok(machines)
    }

    /// Create and register a new machine.
    ///
    /// Settings files go under `base_folder`, or the VirtualBox default if None.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty name and `AlreadyExists` if the
    /// name is taken; neither case invokes `createvm`.
    pub async fn create_machine(
        &self,
        name: &str,
        base_folder: Option<&Path>,
    ) -> Result<VirtualMachine> {
        if name.is_empty() {
            return Err(VmError::InvalidInput("machine name is empty".into()));
        }

        // Not atomic: another client may register the same name in between.
        if self
            .list_registered()
            .await?
            .iter()
            .any(|entry| entry.name == name)
        {
            return Err(VmError::AlreadyExists(name.to_string()));
        }

        tracing::info!(name, ?base_folder, "Creating VM");
        self.runner
            .run(&commands::create_vm(name, base_folder))
            .await?;

        self.get_machine(name).await
    }
}
