//! VirtualMachine type - lifecycle control for a registered machine.

use crate::commands;
use crate::config::VBoxConfig;
use crate::devices::{Nic, PortForward, StorageController, StorageMedium};
use crate::error::{Result, VmError};
use crate::executor::CommandRunner;
use crate::manager::query_machine;
use crate::record::Machine;
use crate::types::MachineState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Handle to a registered machine.
///
/// Every lifecycle operation looks at the last observed state and issues only
/// the commands needed to reach the target; requests that are already
/// satisfied are no-ops. Only [`modify`](Self::modify) and
/// [`stop`](Self::stop) re-read the machine afterwards, so call
/// [`refresh`](Self::refresh) to observe the outcome of the others.
pub struct VirtualMachine {
    /// Last observed configuration and state
    record: Machine,
    /// Backend used for every invocation
    runner: Arc<dyn CommandRunner>,
    /// Delay between power-button presses in `stop`
    poll_interval: Duration,
    /// Power-button presses before `stop` gives up
    max_stop_attempts: u32,
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("record", &self.record)
            .field("poll_interval", &self.poll_interval)
            .field("max_stop_attempts", &self.max_stop_attempts)
            .finish_non_exhaustive()
    }
}

impl VirtualMachine {
    pub(crate) fn new(
        record: Machine,
        runner: Arc<dyn CommandRunner>,
        config: &VBoxConfig,
    ) -> Self {
        Self {
            record,
            runner,
            poll_interval: config.stop_poll_interval(),
            max_stop_attempts: config.stop_max_attempts,
        }
    }

    /// Get the last observed record.
    pub fn record(&self) -> &Machine {
        &self.record
    }

    /// Get the record for editing before [`modify`](Self::modify).
    pub fn record_mut(&mut self) -> &mut Machine {
        &mut self.record
    }

    /// Get the identifier commands are addressed to.
    pub fn id(&self) -> &str {
        self.record.id()
    }

    /// Get the last observed state.
    pub fn state(&self) -> &MachineState {
        self.record.state()
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        self.runner.run(&args).await.map(|_| ())
    }

    async fn control(&self, action: &[&str]) -> Result<()> {
        self.run(commands::control_vm(self.id(), action)).await
    }

    /// Reload the record from VBoxManage, replacing every field.
    ///
    /// # Errors
    /// Returns `NotFound` if the machine is no longer registered.
    pub async fn refresh(&mut self) -> Result<()> {
        let id = self.id().to_string();
        if id.is_empty() {
            return Err(VmError::InvalidInput(
                "machine has neither name nor UUID".into(),
            ));
        }
        self.record = query_machine(self.runner.as_ref(), &id).await?;
        Ok(())
    }

    /// Start the machine: resume if paused, power on headless if stopped.
    pub async fn start(&mut self) -> Result<()> {
        match self.record.state() {
            MachineState::Paused => {
                tracing::info!(id = %self.id(), "Resuming VM");
                self.control(&["resume"]).await
            }
            MachineState::Poweroff | MachineState::Saved | MachineState::Aborted => {
                tracing::info!(id = %self.id(), "Starting VM headless");
                self.run(commands::start_headless(self.id())).await
            }
            _ => Ok(()),
        }
    }

    /// Start, then treat the machine as running for the rest of a composite
    /// operation.
    async fn start_as_running(&mut self) -> Result<()> {
        self.start().await?;
        self.record.set_state(MachineState::Running);
        Ok(())
    }

    /// Save the machine state to disk.
    pub async fn save(&mut self) -> Result<()> {
        if self.record.state().is_stopped() {
            return Ok(());
        }
        if *self.record.state() == MachineState::Paused {
            self.start_as_running().await?;
        }
        tracing::info!(id = %self.id(), "Saving VM state");
        self.control(&["savestate"]).await
    }

    /// Pause execution of a running machine.
    pub async fn pause(&mut self) -> Result<()> {
        if self.record.state().is_stopped() || *self.record.state() == MachineState::Paused {
            return Ok(());
        }
        tracing::info!(id = %self.id(), "Pausing VM");
        self.control(&["pause"]).await
    }

    /// Stop the machine gracefully with the ACPI power button.
    ///
    /// The button is pressed, the state re-read after the poll interval, and
    /// the cycle repeated until the machine reports `poweroff`.
    ///
    /// # Errors
    /// Returns `Timeout` if the machine is still up after the configured
    /// number of attempts.
    pub async fn stop(&mut self) -> Result<()> {
        if self.record.state().is_stopped() {
            return Ok(());
        }
        if *self.record.state() == MachineState::Paused {
            self.start_as_running().await?;
        }

        tracing::info!(id = %self.id(), "Stopping VM");
        let started = Instant::now();

        for attempt in 1..=self.max_stop_attempts {
            self.control(&["acpipowerbutton"]).await?;
            tokio::time::sleep(self.poll_interval).await;
            self.refresh().await?;

            if *self.record.state() == MachineState::Poweroff {
                tracing::info!(id = %self.id(), attempts = attempt, "VM powered off");
                return Ok(());
            }
            tracing::debug!(id = %self.id(), attempt, state = %self.record.state(), "VM still up");
        }

        let waited = started.elapsed();
        tracing::warn!(
            id = %self.id(),
            attempts = self.max_stop_attempts,
            ?waited,
            "VM did not power off"
        );
        Err(VmError::Timeout {
            attempts: self.max_stop_attempts,
            waited,
        })
    }

    /// Force the machine off. State is lost and the disk image may be corrupted.
    pub async fn poweroff(&mut self) -> Result<()> {
        if self.record.state().is_stopped() {
            return Ok(());
        }
        tracing::warn!(id = %self.id(), "Forcing VM power off");
        self.control(&["poweroff"]).await
    }

    /// Restart gracefully: stop, then start.
    pub async fn restart(&mut self) -> Result<()> {
        if matches!(self.record.state(), MachineState::Paused | MachineState::Saved) {
            self.start_as_running().await?;
        }
        self.stop().await?;
        self.start().await
    }

    /// Restart forcefully. State is lost and the disk image may be corrupted.
    pub async fn reset(&mut self) -> Result<()> {
        if matches!(self.record.state(), MachineState::Paused | MachineState::Saved) {
            self.start_as_running().await?;
        }
        tracing::warn!(id = %self.id(), "Resetting VM");
        self.control(&["reset"]).await
    }

    /// Power off, then unregister the machine and delete its files.
    ///
    /// This consumes the handle; the record is gone along with the machine.
    pub async fn delete(mut self) -> Result<()> {
        self.poweroff().await?;
        tracing::info!(id = %self.id(), "Deleting VM");
        self.run(commands::unregister_delete(self.id())).await
    }

    /// Apply the record's settings in one `modifyvm`, then reload.
    pub async fn modify(&mut self) -> Result<()> {
        tracing::info!(
            id = %self.id(),
            cpus = self.record.cpus(),
            memory = self.record.memory(),
            "Modifying VM"
        );
        self.run(commands::modify_vm(&self.record)).await?;
        self.refresh().await
    }

    /// Add a NAT port-forwarding rule named `name` to the n-th NIC.
    pub async fn add_nat_port_forward(
        &self,
        nic: u32,
        name: &str,
        rule: &PortForward,
    ) -> Result<()> {
        self.run(commands::add_nat_port_forward(self.id(), nic, name, rule))
            .await
    }

    /// Delete the NAT port-forwarding rule named `name` from the n-th NIC.
    pub async fn delete_nat_port_forward(&self, nic: u32, name: &str) -> Result<()> {
        self.run(commands::delete_nat_port_forward(self.id(), nic, name))
            .await
    }

    /// Configure the n-th NIC.
    pub async fn set_nic(&self, n: u32, nic: &Nic) -> Result<()> {
        self.run(commands::set_nic(self.id(), n, nic)).await
    }

    /// Add a storage controller named `name`.
    pub async fn add_storage_controller(
        &self,
        name: &str,
        ctl: &StorageController,
    ) -> Result<()> {
        self.run(commands::add_storage_controller(self.id(), name, ctl))
            .await
    }

    /// Remove the storage controller named `name`.
    pub async fn delete_storage_controller(&self, name: &str) -> Result<()> {
        self.run(commands::delete_storage_controller(self.id(), name))
            .await
    }

    /// Attach a medium to the named storage controller.
    pub async fn attach_storage(&self, controller: &str, medium: &StorageMedium) -> Result<()> {
        self.run(commands::attach_storage(self.id(), controller, medium))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{DriveType, NicHardware};
    use crate::testing::{FailingRunner, MockRunner};
    use crate::types::{BootDevice, Flags};

    const STOPPED: [MachineState; 3] = [
        MachineState::Poweroff,
        MachineState::Aborted,
        MachineState::Saved,
    ];

    fn info(state: &str) -> String {
        format!(
            "name=\"web01\"\nUUID=\"1234\"\nVMState=\"{state}\"\nmemory=2048\ncpus=2\nvram=16\nCfgFile=\"/vms/web01/web01.vbox\"\n"
        )
    }

    fn fast_config() -> VBoxConfig {
        VBoxConfig::default()
            .with_stop_poll_interval(Duration::ZERO)
            .with_stop_max_attempts(10)
    }

    fn vm_in(state: MachineState, runner: Arc<dyn CommandRunner>) -> VirtualMachine {
        let mut record = Machine::new("web01");
        record.set_state(state);
        VirtualMachine::new(record, runner, &fast_config())
    }

    #[tokio::test]
    async fn test_stopped_states_are_noops() {
        for state in STOPPED {
            let runner = Arc::new(MockRunner::new());
            let mut vm = vm_in(state.clone(), runner.clone());

            vm.stop().await.unwrap();
            vm.pause().await.unwrap();
            vm.poweroff().await.unwrap();

            assert!(runner.is_untouched(), "{state} invoked the tool");
            assert_eq!(vm.state(), &state);
        }
    }

    #[tokio::test]
    async fn test_save_noop_when_stopped() {
        for state in STOPPED {
            let runner = Arc::new(MockRunner::new());
            let mut vm = vm_in(state, runner.clone());
            vm.save().await.unwrap();
            assert!(runner.is_untouched());
        }
    }

    #[tokio::test]
    async fn test_start_from_paused_resumes() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Paused, runner.clone());

        vm.start().await.unwrap();

        assert_eq!(runner.count_exact(&["controlvm", "web01", "resume"]), 1);
        assert_eq!(runner.call_count("startvm"), 0);
    }

    #[tokio::test]
    async fn test_start_from_stopped_powers_on_headless() {
        for state in STOPPED {
            let runner = Arc::new(MockRunner::new());
            let mut vm = vm_in(state, runner.clone());

            vm.start().await.unwrap();

            assert_eq!(
                runner.count_exact(&["startvm", "web01", "--type", "headless"]),
                1
            );
            assert_eq!(runner.call_count("controlvm"), 0);
        }
    }

    #[tokio::test]
    async fn test_start_running_is_noop() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Running, runner.clone());
        vm.start().await.unwrap();
        assert!(runner.is_untouched());
    }

    #[tokio::test]
    async fn test_pause_running() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Running, runner.clone());
        vm.pause().await.unwrap();
        assert_eq!(runner.calls(), vec![vec!["controlvm", "web01", "pause"]]);

        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Paused, runner.clone());
        vm.pause().await.unwrap();
        assert!(runner.is_untouched());
    }

    #[tokio::test]
    async fn test_save_from_paused_resumes_first() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Paused, runner.clone());

        vm.save().await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                vec!["controlvm", "web01", "resume"],
                vec!["controlvm", "web01", "savestate"],
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_polls_until_poweroff() {
        for n in 1..=4 {
            let mut runner = MockRunner::new();
            for _ in 1..n {
                runner = runner.with_output("showvminfo", info("running"));
            }
            let runner = Arc::new(runner.with_output("showvminfo", info("poweroff")));
            let mut vm = vm_in(MachineState::Running, runner.clone());

            vm.stop().await.unwrap();

            assert_eq!(
                runner.count_exact(&["controlvm", "web01", "acpipowerbutton"]),
                n
            );
            assert_eq!(runner.call_count("showvminfo"), n);
            assert_eq!(vm.state(), &MachineState::Poweroff);
            assert_eq!(vm.record().memory(), 2048);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_poll_interval() {
        let runner = Arc::new(
            MockRunner::new()
                .with_output("showvminfo", info("running"))
                .with_output("showvminfo", info("running"))
                .with_output("showvminfo", info("poweroff")),
        );
        let mut record = Machine::new("web01");
        record.set_state(MachineState::Running);
        let mut vm = VirtualMachine::new(record, runner.clone(), &VBoxConfig::default());

        let started = Instant::now();
        vm.stop().await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_stop_times_out() {
        let runner = Arc::new(MockRunner::new().with_output("showvminfo", info("running")));
        let mut vm = vm_in(MachineState::Running, runner.clone());

        let err = vm.stop().await.unwrap_err();

        assert!(matches!(err, VmError::Timeout { attempts: 10, .. }));
        assert_eq!(runner.call_count("showvminfo"), 10);
    }

    #[tokio::test]
    async fn test_stop_from_paused_resumes_once() {
        let runner = Arc::new(MockRunner::new().with_output("showvminfo", info("poweroff")));
        let mut vm = vm_in(MachineState::Paused, runner.clone());

        vm.stop().await.unwrap();

        assert_eq!(runner.count_exact(&["controlvm", "web01", "resume"]), 1);
        assert_eq!(runner.count_exact(&["controlvm", "web01", "acpipowerbutton"]), 1);
    }

    #[tokio::test]
    async fn test_stop_propagates_button_failure() {
        let runner = Arc::new(FailingRunner::new("VBoxManage: error: Machine is locked"));
        let mut vm = vm_in(MachineState::Running, runner.clone());
        assert!(matches!(vm.stop().await, Err(VmError::Command { .. })));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_poweroff_running_and_paused() {
        for state in [MachineState::Running, MachineState::Paused] {
            let runner = Arc::new(MockRunner::new());
            let mut vm = vm_in(state, runner.clone());
            vm.poweroff().await.unwrap();
            assert_eq!(runner.calls(), vec![vec!["controlvm", "web01", "poweroff"]]);
        }
    }

    #[tokio::test]
    async fn test_restart_from_saved() {
        let runner = Arc::new(MockRunner::new().with_output("showvminfo", info("poweroff")));
        let mut vm = vm_in(MachineState::Saved, runner.clone());

        vm.restart().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0], vec!["startvm", "web01", "--type", "headless"]);
        assert_eq!(calls[1], vec!["controlvm", "web01", "acpipowerbutton"]);
        assert_eq!(calls[2][0], "showvminfo");
        assert_eq!(calls[3], vec!["startvm", "web01", "--type", "headless"]);
        assert_eq!(calls.len(), 4);
    }

    #[tokio::test]
    async fn test_restart_fails_fast_on_start_error() {
        let runner = Arc::new(FailingRunner::new("VBoxManage: error: no"));
        let mut vm = vm_in(MachineState::Paused, runner.clone());
        assert!(vm.restart().await.is_err());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_from_paused() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = vm_in(MachineState::Paused, runner.clone());

        vm.reset().await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                vec!["controlvm", "web01", "resume"],
                vec!["controlvm", "web01", "reset"],
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_fails_fast_on_start_error() {
        let runner = Arc::new(FailingRunner::new("VBoxManage: error: no"));
        let mut vm = vm_in(MachineState::Saved, runner.clone());
        assert!(vm.reset().await.is_err());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_powers_off_first() {
        let runner = Arc::new(MockRunner::new());
        let vm = vm_in(MachineState::Running, runner.clone());

        vm.delete().await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                vec!["controlvm", "web01", "poweroff"],
                vec!["unregistervm", "web01", "--delete"],
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_stopped_skips_poweroff() {
        let runner = Arc::new(MockRunner::new());
        let vm = vm_in(MachineState::Poweroff, runner.clone());
        vm.delete().await.unwrap();
        assert_eq!(runner.calls(), vec![vec!["unregistervm", "web01", "--delete"]]);
    }

    #[tokio::test]
    async fn test_modify_refreshes_record() {
        let runner = Arc::new(MockRunner::new().with_output("showvminfo", info("poweroff")));
        let mut vm = vm_in(MachineState::Poweroff, runner.clone());
        vm.record_mut().set_memory(4096);
        vm.record_mut().set_flags(Flags::ACPI);
        vm.record_mut().set_boot_order(vec![BootDevice::Disk]);

        vm.modify().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0], "modifyvm");
        assert!(calls[0].windows(2).any(|w| w == ["--memory", "4096"]));
        assert!(calls[0].windows(2).any(|w| w == ["--boot1", "disk"]));
        assert_eq!(calls[1], vec!["showvminfo", "web01", "--machinereadable"]);
        // The record now mirrors what VBoxManage reports.
        assert_eq!(vm.record().memory(), 2048);
    }

    #[tokio::test]
    async fn test_refresh_maps_not_found() {
        let runner = Arc::new(FailingRunner::new(
            "VBoxManage: error: Could not find a registered machine named 'web01'",
        ));
        let mut vm = vm_in(MachineState::Running, runner);
        assert!(vm.refresh().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_refresh_without_identifier() {
        let runner = Arc::new(MockRunner::new());
        let mut vm = VirtualMachine::new(Machine::default(), runner.clone(), &fast_config());
        assert!(matches!(vm.refresh().await, Err(VmError::InvalidInput(_))));
        assert!(runner.is_untouched());
    }

    #[tokio::test]
    async fn test_peripheral_commands() {
        let runner = Arc::new(MockRunner::new());
        let vm = vm_in(MachineState::Poweroff, runner.clone());

        vm.add_nat_port_forward(1, "ssh", &PortForward::tcp(2222, 22))
            .await
            .unwrap();
        vm.delete_nat_port_forward(1, "ssh").await.unwrap();
        vm.set_nic(1, &Nic::nat(NicHardware::Virtio)).await.unwrap();
        vm.add_storage_controller("SATA", &StorageController::default())
            .await
            .unwrap();
        vm.attach_storage(
            "SATA",
            &StorageMedium {
                port: 0,
                device: 0,
                drive_type: DriveType::Hdd,
                medium: "/vms/web01/disk.vdi".into(),
            },
        )
        .await
        .unwrap();
        vm.delete_storage_controller("SATA").await.unwrap();

        let subcommands: Vec<String> = runner.calls().into_iter().map(|c| c[0].clone()).collect();
        assert_eq!(
            subcommands,
            vec![
                "controlvm",
                "controlvm",
                "modifyvm",
                "storagectl",
                "storageattach",
                "storagectl"
            ]
        );
        assert_eq!(vm.state(), &MachineState::Poweroff);
    }
}
