//! Command implementations

pub mod config;
pub mod run;
pub mod stress;

use anyhow::Result;
use serde::Serialize;
use std::fmt::Display;

/// Print a report as text, or as pretty JSON when `json` is set
pub fn print_report<T>(report: &T, json: bool) -> Result<()>
where
    T: Serialize + Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
