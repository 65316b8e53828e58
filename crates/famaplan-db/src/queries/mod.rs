pub mod ai_cache;
pub mod plans;
