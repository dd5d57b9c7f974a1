//! Outer surfaces: the CSV checkout script, the script runner and the JSON
//! report.

pub mod csv;
pub mod report;
pub mod runner;
