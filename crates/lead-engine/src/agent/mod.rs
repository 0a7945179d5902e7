//! # Agent Model
//!
//! Sales agents, their specialties, capacity counters and performance
//! history. Agents are created and edited by an admin workflow; the engine
//! mutates them only through the workload ledger.

pub mod hours;
pub mod types;

pub use hours::{DaySchedule, WorkingHours};
pub use types::{
    Agent, AgentId, AgentStatus, AmountRange, LoadState, Performance, Specialties, Workload,
    MAX_PRIORITY,
};
