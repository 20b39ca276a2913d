//! SQL drivers backed by the vendor command-line clients.
//!
//! Connection parameters travel as arguments and environment variables, the
//! query itself travels on stdin or as a single argument. Nothing is ever
//! spliced into a shell string.

mod mysql;
mod postgres;
mod sqlite;
pub mod table;

pub use mysql::{MYSQL_DRIVER, MysqlDriver};
pub use postgres::{POSTGRES_DRIVER, PostgresDriver};
pub use sqlite::{SQLITE_DRIVER, SqliteDriver};

use super::driver::{DriverConfig, DriverError, ExecResult, Row};
use crate::utils::exec::CmdOutput;

/// Turn client output into a result, attaching rows when the parse succeeds.
///
/// Raw text always stays in `output` so statements without a result set
/// (`INSERT`, `CREATE`) still show what the client printed.
fn to_result(out: &CmdOutput, parse: fn(&str) -> Option<Vec<Row>>) -> ExecResult {
    let result = ExecResult::from_output(out);
    if !result.success {
        return result;
    }
    match parse(&out.stdout) {
        Some(rows) => result.with_data(rows),
        None => result,
    }
}

/// Non-empty config value.
fn param<'a>(config: &'a DriverConfig, key: &str) -> Option<&'a str> {
    config
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn required<'a>(config: &'a DriverConfig, key: &str, driver: &str) -> Result<&'a str, DriverError> {
    param(config, key).ok_or_else(|| {
        DriverError::InvalidConfig(format!("{driver} connection requires `{key}`"))
    })
}
