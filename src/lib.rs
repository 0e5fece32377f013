pub mod agents;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod outlet;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::SessionError;
pub use session::{launch, CreativeSession};
pub use types::delta::DeltaRecord;
pub use types::request::WriterRequest;
