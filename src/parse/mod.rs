pub mod segment;
pub mod tokenize;
pub mod types;

pub use segment::{DEFAULT_ERROR_PREFIX, ParseOptions, segment};
pub use tokenize::{CompletionTarget, completion_target, join, quote, tokenize};
pub use types::{Operator, Segment, SegmentStatus, Word, WordStatus};
