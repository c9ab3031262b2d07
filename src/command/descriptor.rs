//! The supported commands and the remote call each one maps to

use crate::vehicle::Operation;

/// How a command's path parameters turn into a remote call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    /// No extra parameter, always the same call
    Fixed(Operation),
    /// `/{limit}`: integer percent in 1..=100
    ChargeLimit,
    /// `/{temp}`: number in the configured unit system
    Temperature,
}

/// One row of the command table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandDescriptor {
    /// First path segment, e.g. `lock` in `/lock/{vehicle}`
    pub name: &'static str,
    pub binding: Binding,
}

/// Every command the relay serves
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "honk",
        binding: Binding::Fixed(Operation::HonkHorn),
    },
    CommandDescriptor {
        name: "flash",
        binding: Binding::Fixed(Operation::FlashLights),
    },
    CommandDescriptor {
        name: "lock",
        binding: Binding::Fixed(Operation::LockDoors),
    },
    CommandDescriptor {
        name: "unlock",
        binding: Binding::Fixed(Operation::UnlockDoors),
    },
    CommandDescriptor {
        name: "start_charge",
        binding: Binding::Fixed(Operation::StartCharging),
    },
    CommandDescriptor {
        name: "stop_charge",
        binding: Binding::Fixed(Operation::StopCharging),
    },
    CommandDescriptor {
        name: "open_charge_port",
        binding: Binding::Fixed(Operation::OpenChargePort),
    },
    CommandDescriptor {
        name: "set_charge_limit",
        binding: Binding::ChargeLimit,
    },
    CommandDescriptor {
        name: "start_hvac",
        binding: Binding::Fixed(Operation::StartClimate),
    },
    CommandDescriptor {
        name: "stop_hvac",
        binding: Binding::Fixed(Operation::StopClimate),
    },
    CommandDescriptor {
        name: "set_temperature",
        binding: Binding::Temperature,
    },
];

impl CommandDescriptor {
    /// Find the command whose name is the first path segment
    pub fn lookup(name: &str) -> Option<&'static CommandDescriptor> {
        COMMANDS.iter().find(|c| c.name == name)
    }

    /// Number of path segments after the command name
    pub fn param_count(&self) -> usize {
        match self.binding {
            Binding::Fixed(_) => 1,
            Binding::ChargeLimit | Binding::Temperature => 2,
        }
    }

    /// Route pattern, for logs and docs
    pub fn pattern(&self) -> String {
        match self.binding {
            Binding::Fixed(_) => format!("/{}/{{vehicle}}", self.name),
            Binding::ChargeLimit => format!("/{}/{{vehicle}}/{{limit}}", self.name),
            Binding::Temperature => format!("/{}/{{vehicle}}/{{temp}}", self.name),
        }
    }
}
