//! Version transformation chain.
//!
//! Exported table data carries the schema of the release it was exported
//! at. Before any merge planning, the chain replays the schema migrations
//! that separate the snapshot's recorded version from the running
//! environment's version, in ascending version order, over the full
//! multi-table mapping (migrations may split or merge tables).

pub mod chain;
pub mod registry;

pub use chain::{TableData, Transformation, TransformationChain};
pub use registry::{builtin_chain, running_version};
