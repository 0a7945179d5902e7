//! # Lead Routing Module
//!
//! Decides which agent receives an inbound lead and reserves that agent's
//! capacity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Inbound Lead                          │
//! │        (amount?, purpose?, region?, language?)              │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ validate
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                   Candidate Selection                       │
//! │  - status == active                                         │
//! │  - working hours (optional)                                 │
//! │  - region / language hints (optional)                       │
//! │  - current_leads < max_leads                                │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!           ┌───────────────┴───────────────┐
//!           │                               │
//! ┌─────────▼─────────┐           ┌─────────▼─────────┐
//! │     Weighted      │           │    Round-Robin    │
//! │                   │           │                   │
//! │ • five-part score │           │ • fewest assigned │
//! │ • desc, id ties   │           │   today, id ties  │
//! └─────────┬─────────┘           └─────────┬─────────┘
//!           └───────────────┬───────────────┘
//!                           │ try_claim, next candidate on loss
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │     Assigned(lease)   |   NoAgentAvailable(reason)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scoring and ranking are read-only and run concurrently across requests.
//! Only the claim touches shared state, and it is atomic in the ledger.

pub mod engine;
pub mod outcome;
pub mod ranking;
pub mod scoring;

pub use engine::AssignmentEngine;
pub use outcome::{Assignment, AssignmentOutcome, NoAgentReason};
pub use ranking::{rank_by_score, rank_round_robin, RankedCandidate};
pub use scoring::{ScoreBreakdown, Scorer};
