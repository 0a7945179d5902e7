//! Storage backends
//!
//! A backend implements every persistence seam: the [`AgentDirectory`],
//! the [`WorkloadLedger`], the [`LeaseLedger`] and the [`AssignmentLog`].
//! The engine only ever sees them through `Arc<dyn AgentStore>`.

pub mod memory;
#[cfg(test)]
pub(crate) mod faulty;

pub use memory::MemoryAgentStore;

use crate::audit::AssignmentLog;
use crate::directory::AgentDirectory;
use crate::lease::LeaseLedger;
use crate::ledger::WorkloadLedger;

/// Everything the assignment engine needs from storage
pub trait AgentStore: AgentDirectory + WorkloadLedger + LeaseLedger + AssignmentLog {}

impl<T> AgentStore for T where T: AgentDirectory + WorkloadLedger + LeaseLedger + AssignmentLog {}
