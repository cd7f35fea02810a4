//! Transaction engine subsystem.
//!
//! # Data Flow
//! ```text
//! Vault (live mode)
//!     → engine.rs (validate → build → simulate → prepare → sign → submit)
//!     → confirmation.rs (poll status until terminal or deadline)
//!     → attempt.rs (per-mutation stage record, attempt_id in logs)
//! ```
//!
//! # Design Decisions
//! - Balances are read by simulation; nothing is signed for a read
//! - Withdraw feasibility is searched downward in base units, bounded
//! - A timed-out confirmation is reported as unknown, never resubmitted

pub mod attempt;
pub mod confirmation;
pub mod engine;

pub use attempt::{AttemptStage, TransactionAttempt};
pub use confirmation::{Confirmation, ConfirmationPoller};
pub use engine::{TransactionEngine, TransactionOutcome};
