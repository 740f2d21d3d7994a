//! Machine registry for frontend discovery.
//!
//! Each runnable machine self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] containing its CLI name and a factory from source text.
//! The frontend discovers available machines at runtime without a central
//! list.

use wirepulse_core::core::machine::Machine;
use wirepulse_core::pulse::AsmError;
use wirepulse_core::wire::WireError;

/// Errors a machine factory can produce.
#[derive(Debug)]
pub enum MachineError {
    Asm(AsmError),
    Wire(WireError),
}

impl std::fmt::Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asm(e) => write!(f, "{e}"),
            Self::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MachineError {}

impl From<AsmError> for MachineError {
    fn from(e: AsmError) -> Self {
        Self::Asm(e)
    }
}

impl From<WireError> for MachineError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

/// Describes a runnable machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "computer").
    pub name: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Factory: construct the machine from a source file's text.
    pub create: fn(&str) -> Result<Box<dyn Machine>, MachineError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn(&str) -> Result<Box<dyn Machine>, MachineError>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// All registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
