//! Plan identifiers, the in-memory plan session and plan persistence.

pub mod id;
pub mod repository;
pub mod service;
pub mod session;

pub use id::{PlanId, PlanIdParseError, next_plan_id};
pub use repository::{MemoryPlanRepository, PgPlanRepository, PlanRepository};
pub use service::{
    MAX_ALLOCATION_ATTEMPTS, SaveError, allocate_plan_id, prepare_plan_id, save_plan,
};
pub use session::{PlanPatch, PlanSession, apply};
