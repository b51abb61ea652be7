pub mod checks;
pub mod config;
pub mod entities;
pub mod factory;
pub mod ids;
pub mod intents;
pub mod merge;
pub mod node;
pub mod organizer;
pub mod pipeline;
pub mod records;
pub mod skill;
pub mod title;
pub mod types;

pub use checks::CheckReport;
pub use config::Config;
pub use node::Node;
pub use pipeline::{Generated, PipelineError};
pub use skill::SkillDocument;
pub use types::*;
