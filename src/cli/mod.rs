//! Terminal output for the `careerscope` binary.

mod table;
pub mod render;

pub use table::{render_record, render_table};
