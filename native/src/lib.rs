pub mod config;
pub mod decode;
pub mod error;
pub mod geometry;
pub mod ipc;
pub mod logging;
pub mod prelude;
pub mod procedures;
pub mod process;
pub mod query;
pub mod session;

pub use config::BridgeConfig;
pub use decode::{decode, Value};
pub use error::{BridgeError, Result};
pub use geometry::{Point, Rectangle, WorldPoint};
pub use procedures::Procedures;
pub use process::{FixedProcess, PayloadLoader, ProcessLocator};
pub use query::{ChainLink, Segment, Target};
pub use session::{Session, SessionBuilder};

#[cfg(windows)]
pub use process::ExecutableLocator;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
