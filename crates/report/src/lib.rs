//! Report output for the power position extract.

pub mod writer;

pub use writer::ReportWriter;
