//! Theme Parser
//!
//! Pure transformation from the storefront's nested section/block JSON into
//! the ordered, typed component tree the mobile renderer consumes. No I/O,
//! no hidden state.

pub mod parser;
pub mod tokens;

pub use parser::{ParsedTheme, parse, parse_section_document};
pub use tokens::{TokenBucket, classify_token, extract_style_tokens};
