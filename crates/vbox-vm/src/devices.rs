//! Peripheral descriptors: NAT port forwarding, NICs and storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Transport protocol of a NAT port-forwarding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// NAT port-forwarding rule: host port to guest port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForward {
    /// Transport protocol
    pub protocol: Protocol,
    /// Host address to bind (all addresses if None)
    pub host_ip: Option<IpAddr>,
    /// Host port
    pub host_port: u16,
    /// Guest address (the NAT default if None)
    pub guest_ip: Option<IpAddr>,
    /// Guest port
    pub guest_port: u16,
}

impl PortForward {
    /// TCP rule on all host addresses.
    pub fn tcp(host_port: u16, guest_port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            host_ip: None,
            host_port,
            guest_ip: None,
            guest_port,
        }
    }

    /// UDP rule on all host addresses.
    pub fn udp(host_port: u16, guest_port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            ..Self::tcp(host_port, guest_port)
        }
    }

    /// Bind the rule to a specific host address.
    pub fn with_host_ip(mut self, ip: IpAddr) -> Self {
        self.host_ip = Some(ip);
        self
    }

    /// Forward to a specific guest address.
    pub fn with_guest_ip(mut self, ip: IpAddr) -> Self {
        self.guest_ip = Some(ip);
        self
    }
}

/// Renders `proto,hostip,hostport,guestip,guestport`; unset addresses are empty.
impl fmt::Display for PortForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host_ip = self.host_ip.map(|ip| ip.to_string()).unwrap_or_default();
        let guest_ip = self.guest_ip.map(|ip| ip.to_string()).unwrap_or_default();
        write!(
            f,
            "{},{},{},{},{}",
            self.protocol, host_ip, self.host_port, guest_ip, self.guest_port
        )
    }
}

/// Attachment mode of a virtual NIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NicNetwork {
    None,
    Null,
    Nat,
    Bridged,
    Intnet,
    Hostonly,
    Generic,
}

impl NicNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            NicNetwork::None => "none",
            NicNetwork::Null => "null",
            NicNetwork::Nat => "nat",
            NicNetwork::Bridged => "bridged",
            NicNetwork::Intnet => "intnet",
            NicNetwork::Hostonly => "hostonly",
            NicNetwork::Generic => "generic",
        }
    }
}

/// Emulated NIC hardware model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NicHardware {
    /// AMD PCnet-PCI II
    Am79C970A,
    /// AMD PCnet-FAST III
    Am79C973,
    /// Intel PRO/1000 MT Desktop
    I82540EM,
    /// Intel PRO/1000 T Server
    I82543GC,
    /// Intel PRO/1000 MT Server
    I82545EM,
    /// Paravirtualized network adapter
    Virtio,
}

impl NicHardware {
    pub fn as_str(&self) -> &'static str {
        match self {
            NicHardware::Am79C970A => "Am79C970A",
            NicHardware::Am79C973 => "Am79C973",
            NicHardware::I82540EM => "82540EM",
            NicHardware::I82543GC => "82543GC",
            NicHardware::I82545EM => "82545EM",
            NicHardware::Virtio => "virtio",
        }
    }
}

/// Virtual NIC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    /// Attachment mode
    pub network: NicNetwork,
    /// Emulated hardware
    pub hardware: NicHardware,
    /// Host-only adapter name, used only when `network` is hostonly
    pub hostonly_adapter: Option<String>,
}

impl Nic {
    /// NAT-attached NIC.
    pub fn nat(hardware: NicHardware) -> Self {
        Self {
            network: NicNetwork::Nat,
            hardware,
            hostonly_adapter: None,
        }
    }

    /// NIC attached to the named host-only adapter.
    pub fn hostonly(hardware: NicHardware, adapter: impl Into<String>) -> Self {
        Self {
            network: NicNetwork::Hostonly,
            hardware,
            hostonly_adapter: Some(adapter.into()),
        }
    }
}

/// Bus a storage controller sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemBus {
    Ide,
    Sata,
    Scsi,
    Floppy,
}

impl SystemBus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemBus::Ide => "ide",
            SystemBus::Sata => "sata",
            SystemBus::Scsi => "scsi",
            SystemBus::Floppy => "floppy",
        }
    }
}

/// Storage controller chipset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chipset {
    PIIX3,
    PIIX4,
    ICH6,
    IntelAhci,
    LSILogic,
    BusLogic,
}

impl Chipset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chipset::PIIX3 => "PIIX3",
            Chipset::PIIX4 => "PIIX4",
            Chipset::ICH6 => "ICH6",
            Chipset::IntelAhci => "IntelAhci",
            Chipset::LSILogic => "LSILogic",
            Chipset::BusLogic => "BusLogic",
        }
    }
}

/// Storage controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageController {
    /// Bus type; omitted from the command if None
    pub bus: Option<SystemBus>,
    /// Port count; omitted from the command if 0
    pub ports: u32,
    /// Chipset; omitted from the command if None
    pub chipset: Option<Chipset>,
    /// Use the host I/O cache
    pub host_io_cache: bool,
    /// Controller is bootable
    pub bootable: bool,
}

/// Kind of drive a medium is attached as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveType {
    DvdDrive,
    Hdd,
    Fdd,
}

impl DriveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveType::DvdDrive => "dvddrive",
            DriveType::Hdd => "hdd",
            DriveType::Fdd => "fdd",
        }
    }
}

/// Medium attached to a storage controller port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMedium {
    /// Controller port
    pub port: u32,
    /// Device slot on the port
    pub device: u32,
    /// Drive type
    pub drive_type: DriveType,
    /// `none`, `emptydrive`, `additions`, a UUID or a file path
    pub medium: String,
}
