pub mod aggregate;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod facts;
pub mod graph;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod roles;
pub mod rules;
pub mod scope;
pub mod suppression;

pub use cancel::CancellationToken;
pub use config::Config;
pub use error::{Result, ShamashError};
pub use facts::FactIndex;
pub use model::Finding;
pub use pipeline::{run_scan, ScanOutcome};
pub use rules::RuleRegistry;
