pub mod allocations;
pub mod allocator;
pub mod error;
pub mod events;
pub mod service;
pub mod split_config;
pub mod transactions;
pub mod withdrawals;

pub use allocations::AllocationBook;
pub use error::LedgerError;
pub use events::{AllocationBatch, LedgerEvent};
pub use service::{
    Confirmation, LedgerOptions, SplitChange, SplitLedger, TransactionFilter, WithdrawalOutcome,
};
pub use split_config::{ConfigSnapshot, SplitConfiguration, SplitSummary};
pub use transactions::TransactionLog;
