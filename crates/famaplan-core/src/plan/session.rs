//! The plan being edited and the pure transformations applied to it.
//!
//! Every edit is a [`PlanPatch`] fed through [`apply`], which consumes the
//! old plan and returns the new one. [`PlanSession`] owns the current plan
//! and tracks whether it has been persisted and whether it has unsaved
//! changes.
//!
//! Two rules hold after every patch:
//! - the plan identifier, once set, is never replaced by a patch;
//! - the reception record mirrors the identifier and promoter name.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use famaplan_db::models::{
    BusinessPlan, BusinessProject, ExecutiveSummary, Financing, HumanResources, Identification,
    Investment, MarketAnalysis, PlanRecord, Projections, Reception, Strategy, Swot, TeamMember,
};

use super::id::PlanId;
use crate::distill::SectionPayload;

/// A single edit to a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanPatch {
    ExecutiveSummary(ExecutiveSummary),
    /// Replaces the identification section but keeps the current plan id.
    Identification(Identification),
    /// Sets the plan id; ignored when the plan already has one.
    AssignPlanId(PlanId),
    MarketAnalysis(MarketAnalysis),
    BusinessProject(BusinessProject),
    HumanResources(HumanResources),
    Strategy(Strategy),
    Swot(Swot),
    Investment(Investment),
    Financing(Financing),
    Projections(Projections),
    /// Replaces the reception section; the mirrored fields are recomputed.
    Reception(Reception),
    AddTeamMember(TeamMember),
    RemoveTeamMember { id: String },
    /// Result of a distillation, replacing every AI-owned section.
    Distilled(SectionPayload),
}

/// Apply one patch, returning the updated plan.
pub fn apply(mut plan: BusinessPlan, patch: PlanPatch) -> BusinessPlan {
    match patch {
        PlanPatch::ExecutiveSummary(section) => plan.sumario_executivo = section,
        PlanPatch::Identification(mut section) => {
            section.plan_id = std::mem::take(&mut plan.identificacao.plan_id);
            plan.identificacao = section;
        }
        PlanPatch::AssignPlanId(id) => {
            if plan.identificacao.plan_id.is_empty() {
                plan.identificacao.plan_id = id.to_string();
            }
        }
        PlanPatch::MarketAnalysis(section) => plan.analise_mercado = section,
        PlanPatch::BusinessProject(section) => plan.projeto_negocio = section,
        PlanPatch::HumanResources(mut section) => {
            assign_member_ids(&mut section.membros);
            plan.recursos_humanos = section;
        }
        PlanPatch::Strategy(section) => plan.estrategia = section,
        PlanPatch::Swot(section) => plan.swot = section,
        PlanPatch::Investment(section) => plan.investimento = section,
        PlanPatch::Financing(section) => plan.financiamento = section,
        PlanPatch::Projections(section) => plan.projecoes = section,
        PlanPatch::Reception(section) => plan.rececao = section,
        PlanPatch::AddTeamMember(member) => {
            plan.recursos_humanos.membros.push(member);
            assign_member_ids(&mut plan.recursos_humanos.membros);
        }
        PlanPatch::RemoveTeamMember { id } => {
            plan.recursos_humanos.membros.retain(|m| m.id != id);
        }
        PlanPatch::Distilled(payload) => plan = payload.merge_into(plan),
    }
    sync_reception(plan)
}

/// Copy the identifier and promoter name into the reception record.
pub fn sync_reception(mut plan: BusinessPlan) -> BusinessPlan {
    if plan.rececao.projeto_id != plan.identificacao.plan_id {
        plan.rececao.projeto_id = plan.identificacao.plan_id.clone();
    }
    if plan.rececao.projeto_nome != plan.identificacao.nome_promotor {
        plan.rececao.projeto_nome = plan.identificacao.nome_promotor.clone();
    }
    plan
}

/// Give every member without an id a fresh one.
pub(crate) fn assign_member_ids(members: &mut [TeamMember]) {
    for member in members.iter_mut().filter(|m| m.id.is_empty()) {
        member.id = Uuid::new_v4().to_string();
    }
}

/// Return `plan` carrying `id` as its identifier, whatever it had before.
///
/// Used only by persistence, where the stored identifier is authoritative.
pub(crate) fn with_plan_id(mut plan: BusinessPlan, id: &str) -> BusinessPlan {
    plan.identificacao.plan_id = id.to_string();
    sync_reception(plan)
}

/// The plan currently being authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSession {
    /// Whether the plan has been stored at least once under its identifier.
    #[serde(default)]
    persisted: bool,
    /// Whether there are edits not yet saved.
    #[serde(default)]
    dirty: bool,
    plan: BusinessPlan,
}

impl PlanSession {
    /// Start a new, empty plan.
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            persisted: false,
            dirty: false,
            plan: BusinessPlan::blank(now),
        }
    }

    /// Resume editing a persisted plan.
    pub fn from_record(record: PlanRecord) -> Self {
        Self {
            persisted: true,
            dirty: false,
            plan: with_plan_id(record.data, &record.id),
        }
    }

    pub fn plan(&self) -> &BusinessPlan {
        &self.plan
    }

    /// The identifier, provisional or persisted; `None` while unassigned.
    pub fn plan_id(&self) -> Option<&str> {
        let id = self.plan.identificacao.plan_id.as_str();
        (!id.is_empty()).then_some(id)
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply a patch and mark the session as having unsaved changes.
    pub fn apply(&mut self, patch: PlanPatch) {
        let plan = std::mem::take(&mut self.plan);
        self.plan = apply(plan, patch);
        self.dirty = true;
    }

    /// Drop a provisional identifier so a fresh one gets allocated.
    pub(crate) fn clear_provisional_id(&mut self) {
        if !self.persisted {
            self.plan = with_plan_id(std::mem::take(&mut self.plan), "");
        }
    }

    /// Adopt the stored version of the plan after a successful save.
    pub fn mark_saved(&mut self, record: &PlanRecord) {
        self.plan = with_plan_id(record.data.clone(), &record.id);
        self.persisted = true;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn session() -> PlanSession {
        PlanSession::new(Local.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).unwrap())
    }

    fn identified(id: &str, promoter: &str) -> PlanSession {
        let mut s = session();
        s.apply(PlanPatch::AssignPlanId(id.parse().unwrap()));
        s.apply(PlanPatch::Identification(Identification {
            nome_promotor: promoter.to_string(),
            ..Identification::default()
        }));
        s
    }

    #[test]
    fn new_session_is_clean_and_unassigned() {
        let s = session();
        assert!(s.plan_id().is_none());
        assert!(!s.is_persisted());
        assert!(!s.is_dirty());
        assert_eq!(s.plan().rececao.data_rececao, "2024-05-02");
    }

    #[test]
    fn assign_plan_id_only_once() {
        let mut s = session();
        s.apply(PlanPatch::AssignPlanId("PN 2024-0003".parse().unwrap()));
        s.apply(PlanPatch::AssignPlanId("PN 2024-0009".parse().unwrap()));
        assert_eq!(s.plan_id(), Some("PN 2024-0003"));
        assert!(s.is_dirty());
    }

    #[test]
    fn identification_patch_keeps_plan_id() {
        let mut s = identified("PN 2024-0003", "Ana Silva");
        s.apply(PlanPatch::Identification(Identification {
            plan_id: "PN 1999-9999".to_string(),
            nome_promotor: "Ana M. Silva".to_string(),
            ..Identification::default()
        }));
        assert_eq!(s.plan_id(), Some("PN 2024-0003"));
        assert_eq!(s.plan().identificacao.nome_promotor, "Ana M. Silva");
    }

    #[test]
    fn reception_mirrors_identity_after_every_patch() {
        let mut s = identified("PN 2024-0003", "Ana Silva");
        assert_eq!(s.plan().rececao.projeto_id, "PN 2024-0003");
        assert_eq!(s.plan().rececao.projeto_nome, "Ana Silva");

        s.apply(PlanPatch::Reception(Reception {
            projeto_id: "forged".to_string(),
            projeto_nome: "forged".to_string(),
            nome_responsavel: "Técnico Municipal".to_string(),
            ..Reception::default()
        }));
        assert_eq!(s.plan().rececao.projeto_id, "PN 2024-0003");
        assert_eq!(s.plan().rececao.projeto_nome, "Ana Silva");
        assert_eq!(s.plan().rececao.nome_responsavel, "Técnico Municipal");
    }

    #[test]
    fn team_members_get_ids() {
        let mut s = session();
        s.apply(PlanPatch::AddTeamMember(TeamMember {
            nome: "Rui".to_string(),
            ..TeamMember::default()
        }));
        s.apply(PlanPatch::AddTeamMember(TeamMember {
            id: "fixed".to_string(),
            nome: "Marta".to_string(),
            ..TeamMember::default()
        }));
        let members = &s.plan().recursos_humanos.membros;
        assert_eq!(members.len(), 2);
        assert!(!members[0].id.is_empty());
        assert_eq!(members[1].id, "fixed");

        s.apply(PlanPatch::RemoveTeamMember {
            id: "fixed".to_string(),
        });
        assert_eq!(s.plan().recursos_humanos.membros.len(), 1);
        assert_eq!(s.plan().recursos_humanos.membros[0].nome, "Rui");
    }

    #[test]
    fn section_patch_replaces_wholesale() {
        let mut s = session();
        s.apply(PlanPatch::Swot(Swot {
            pontos_fortes: vec!["a".into(), "b".into()],
            ameacas: vec!["c".into()],
            ..Swot::default()
        }));
        s.apply(PlanPatch::Swot(Swot {
            pontos_fortes: vec!["z".into()],
            ..Swot::default()
        }));
        assert_eq!(s.plan().swot.pontos_fortes, vec!["z".to_string()]);
        assert!(s.plan().swot.ameacas.is_empty());
    }

    #[test]
    fn mark_saved_adopts_record() {
        let mut s = session();
        s.apply(PlanPatch::Identification(Identification {
            nome_promotor: "Ana Silva".to_string(),
            ..Identification::default()
        }));
        let record = PlanRecord {
            id: "PN 2024-0010".to_string(),
            name: "Ana Silva".to_string(),
            updated_at: chrono::Utc::now(),
            data: s.plan().clone(),
        };
        s.mark_saved(&record);
        assert_eq!(s.plan_id(), Some("PN 2024-0010"));
        assert_eq!(s.plan().rececao.projeto_id, "PN 2024-0010");
        assert!(s.is_persisted());
        assert!(!s.is_dirty());
    }

    #[test]
    fn clear_provisional_id_spares_persisted_plans() {
        let mut s = identified("PN 2024-0003", "Ana");
        s.clear_provisional_id();
        assert!(s.plan_id().is_none());
        assert!(s.plan().rececao.projeto_id.is_empty());

        let mut persisted = PlanSession::from_record(PlanRecord {
            id: "PN 2024-0004".to_string(),
            name: "x".to_string(),
            updated_at: chrono::Utc::now(),
            data: BusinessPlan::default(),
        });
        persisted.clear_provisional_id();
        assert_eq!(persisted.plan_id(), Some("PN 2024-0004"));
    }
}
