// Data Engine Module
// MySQL access, stored connections and schema introspection

pub mod drivers;
pub mod error;
pub mod schema_loader;
pub mod session_manager;
pub mod sql_generator;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use session_manager::{SessionContext, SessionInfo, SessionManager, SessionSettings};
pub use traits::DataEngine;
pub use types::*;
