pub mod cell;
pub mod code_chunk;
pub mod column_ids;
pub mod error;
pub mod filter;
pub mod frame;
pub mod graph;
pub mod ledger;
pub mod performers;
pub mod resolver;
pub mod session;
pub mod state;
pub mod step;

pub use error::StepError;
pub use session::{SavedAnalysis, Session, ANALYSIS_FORMAT_VERSION};
pub use step::{Params, Step, StepRequest};
