pub mod config;
pub mod discovery;
pub mod executor;
pub mod fleet;
pub mod logging;
pub mod model;
pub mod remediation;
pub mod traits;

// Re-export common types for convenience
pub use config::*;
pub use discovery::*;
pub use executor::*;
pub use fleet::*;
pub use model::*;
pub use remediation::*;
pub use traits::*;
