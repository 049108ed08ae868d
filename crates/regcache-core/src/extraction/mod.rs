//! Field extraction: heuristic pass, LLM fallback, learning and merge.

pub mod filter;
pub mod learner;
pub mod orchestrator;
pub mod resolver;

pub use learner::{LearningEngine, LearningReport};
pub use orchestrator::Orchestrator;
pub use resolver::{FieldResolver, Resolution};
