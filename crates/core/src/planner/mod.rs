pub mod engine;
pub mod states;

pub use engine::TurnPlanner;
pub use states::{PlannerDecision, PlannerPolicy};
