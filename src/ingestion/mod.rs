pub mod pipeline;

pub use pipeline::{process_chain_event, run_ingestion, ChainEvent};
