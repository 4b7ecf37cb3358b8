// Repository content engine organized by functionality

pub mod config;
pub mod connection;
pub mod content;
pub mod legacy;
pub mod paths;
pub mod poller;
pub mod protocol;
pub mod resource_api;
pub mod session;
pub mod strategy;

// Re-export main types for convenience
pub use config::{PollConfig, RepositoryConfig, TimeoutPolicy};
pub use connection::{parse_discovery_version, ApiResponse, RepositoryConnection, RequestBody};
pub use content::DataContent;
pub use legacy::{Aspect, LegacyBinding, LegacyDocument, LegacyStrategy};
pub use poller::{Awaited, ExistencePoller, PollOutcome};
pub use protocol::{select_strategy, Protocol, ServerVersion};
pub use resource_api::{NodeEntry, ResourceApiStrategy};
pub use session::{LastResource, SessionContext};
pub use strategy::{ContentStrategy, CreationTarget};

// Test modules
#[cfg(test)]
mod tests;
