//! Converts workload names to actual application code.
//!
//! # Example
//!
//! To get the access-log analyzer:
//! ```
//! # use anyhow::Result;
//! use logmr::workload;
//! # fn main() -> Result<()> {
//! let app = workload::named("access-log")?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

use crate::Workload;
use anyhow::{bail, Result};

pub mod access_log;

/// Name of the workload run when none is given.
pub const DEFAULT_WORKLOAD: &str = "access-log";

/// Gets the [`Workload`] named `name`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "access-log" => Some(Workload {
            map_fn: access_log::map,
            reduce_fn: access_log::reduce,
        }),
        _ => None,
    }
}

/// Gets the [`Workload`] named `name`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was found.
pub fn named(name: &str) -> Result<Workload> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!("No app named `{}` found.", name),
    }
}
