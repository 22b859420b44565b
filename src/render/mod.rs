//! Output rendering (text summary, JSON report, DOT graph)

pub mod dot;
pub mod report;
pub mod summary;

pub use dot::render_dot;
pub use report::write_report;
pub use summary::render_summary;
