//! Concert program data: the record, its store, and the model-facing
//! prompts and reply parsing that fill it.

pub mod extract;
pub mod model;
pub mod prompts;
pub mod store;

pub use extract::{parse_correction, parse_performances, strip_code_fences, ExtractError};
pub use model::{ConcertProgram, ConcertType, MetadataUpdate, Performance};
pub use store::ProgramStore;
