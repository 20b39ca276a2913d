//! Configuration section definitions.
//!
//! Each module corresponds to a section in `lectern.toml`:
//!
//! | Module    | TOML Section   | Purpose                                 |
//! |-----------|----------------|-----------------------------------------|
//! | `serve`   | `[serve]`      | Preview server ports, watch, debounce   |
//! | `execute` | `[execute]`    | Global timeout, shell interpreter       |
//! | `drivers` | `[drivers]`    | Per-driver timeouts, connections, custom|

mod drivers;
mod execute;
mod serve;

pub use drivers::{
    ConnectionConfig, CustomDriverConfig, DEFAULT_CONNECTION, DriverSection, DriversConfig,
};
pub use execute::{DEFAULT_TIMEOUT_SECS, ExecuteConfig};
pub use serve::ServeConfig;
