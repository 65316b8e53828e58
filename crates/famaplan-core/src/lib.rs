//! Core logic for famaplan: plan identifiers, the plan state container and
//! its persistence, the generator client, the distillation pipeline and the
//! smaller AI writing aids.

pub mod assist;
pub mod distill;
pub mod generator;
pub mod plan;
pub mod schema;
