//! Beeline session handling and transcript parsing.
//!
//! Everything here works on text: launching the query tool inside a shell,
//! spotting the markers Beeline prints, and cutting the raw terminal
//! transcript into a result body and a status line.

mod markers;
mod parser;
mod session;

pub use markers::MarkerWatch;
pub use parser::{
    is_tool_error, normalize_line_endings, parse_after_echo, parse_table, parse_transcript,
    ParsedResult,
};
pub use session::{launch_command, SessionInitializer, SessionState};

/// Appended to every statement sent to Beeline.
pub const STATEMENT_TERMINATOR: &str = "\n;\n";

/// Substring Beeline prints when a statement fails.
pub const ERROR_MARKER: &str = "Error";

/// Any of these in newly arrived output ends a query.
pub const QUERY_MARKERS: [&str; 4] = [
    "rows selected",
    "No rows selected",
    "row selected",
    ERROR_MARKER,
];
