pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod journal;
pub mod logging;
pub mod retry;
pub mod traits;

pub use config::*;
pub use config_loader::*;
pub use error::*;
pub use events::*;
pub use journal::*;
pub use logging::*;
pub use retry::*;
pub use traits::*;
