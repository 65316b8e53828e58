//! Plan section types and database row models.
//!
//! Section field names follow the municipal business-plan form and are
//! serialized in camelCase (`pontosFortes`, `bancario7Anos`, ...). Every
//! section deserializes leniently: absent fields take their default, so rows
//! written by older clients (or the `'{}'` column default) always load.
//! Strict shape checks for generated content happen before deserialization.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Number of years covered by the economic-financial projections.
pub const PROJECTION_YEARS: usize = 3;

/// Display name stored when a plan is saved without a promoter name.
pub const UNNAMED_PLAN: &str = "Projeto sem Nome";

// ---------------------------------------------------------------------------
// Identity-owned sections
// ---------------------------------------------------------------------------

/// Section 1: executive summary. `atividades` is the free-text summary that
/// drives distillation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub atividades: String,
    pub objetivos: String,
    pub beneficios: String,
    pub distincao: String,
    pub clientes: String,
    pub equipa: String,
    pub investimento_necessario: String,
}

/// Section 2: promoter identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Identification {
    /// `PN <year>-<seq>` once allocated, empty before that.
    pub plan_id: String,
    pub nome_promotor: String,
    pub data_nascimento: String,
    pub morada: String,
    pub bi_cc: String,
    pub nif: String,
    pub estado_civil: String,
    pub telemovel: String,
    pub email: String,
    pub cae_principal: String,
    pub cae_secundario: String,
    pub natureza_juridica: String,
    pub competencias_tecnicas: String,
    pub experiencia_qualificacoes: String,
    pub formacao_investir: String,
    /// File name of the attached CV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_name: Option<String>,
    /// Attached CV as a data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_data: Option<String>,
}

/// Section 11: reception record kept by the municipality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reception {
    /// Mirror of [`Identification::plan_id`].
    pub projeto_id: String,
    /// Mirror of [`Identification::nome_promotor`].
    pub projeto_nome: String,
    pub nome_responsavel: String,
    pub data_rececao: String,
    pub hora_rececao: String,
}

impl Reception {
    /// A blank reception record stamped with the given local time.
    pub fn stamped(now: DateTime<Local>) -> Self {
        Self {
            data_rececao: now.format("%Y-%m-%d").to_string(),
            hora_rececao: now.format("%H:%M").to_string(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// AI-owned sections
// ---------------------------------------------------------------------------

/// Section 3: market and competition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub necessidades: String,
    pub expectativas: String,
    pub criterios_compra: String,
    pub concorrentes: String,
}

/// Section 4: the project / business itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessProject {
    pub objetivos: String,
    pub acoes: String,
    pub processo: String,
    pub instalacoes: String,
}

/// One member of the team listed under human resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub nome: String,
    pub funcao: String,
    pub condicao: String,
    /// Monthly salary as typed by the user.
    pub salario: String,
}

/// Section 5: human resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HumanResources {
    pub descricao: String,
    pub membros: Vec<TeamMember>,
}

impl HumanResources {
    /// Sum of the monthly salaries that parse as numbers.
    ///
    /// Accepts a decimal comma (`"1200,50"`); anything unparseable counts as 0.
    pub fn monthly_payroll(&self) -> f64 {
        self.membros
            .iter()
            .map(|m| m.salario.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0))
            .sum()
    }
}

/// Section 6: strategy and competitive rationale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Strategy {
    pub fundamentacao: String,
    pub produto: String,
    pub preco: String,
    pub distribuicao: String,
    pub comunicacao: String,
}

/// Section 7: SWOT analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Swot {
    pub pontos_fortes: Vec<String>,
    pub pontos_fracos: Vec<String>,
    pub oportunidades: Vec<String>,
    pub ameacas: Vec<String>,
}

/// Section 8: investment, in euros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Investment {
    pub propriedades_terrenos: f64,
    pub propriedades_edificios: f64,
    pub tangiveis_terrenos: f64,
    pub tangiveis_edificios: f64,
    pub equipamento_basico: f64,
    pub transporte: f64,
    pub administrativo: f64,
    pub biologico: f64,
    pub goodwill: f64,
    pub desenvolvimento: f64,
    pub software: f64,
    pub propriedade_industrial: f64,
    pub diversos: f64,
    pub fundo_maneio: f64,
}

impl Investment {
    pub fn total(&self) -> f64 {
        [
            self.propriedades_terrenos,
            self.propriedades_edificios,
            self.tangiveis_terrenos,
            self.tangiveis_edificios,
            self.equipamento_basico,
            self.transporte,
            self.administrativo,
            self.biologico,
            self.goodwill,
            self.desenvolvimento,
            self.software,
            self.propriedade_industrial,
            self.diversos,
            self.fundo_maneio,
        ]
        .iter()
        .sum()
    }
}

/// Section 9: financing sources, in euros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Financing {
    pub capital_proprio: f64,
    pub bancario_7_anos: f64,
    pub subsidio_desemprego: f64,
    pub outros: f64,
}

impl Financing {
    pub fn total(&self) -> f64 {
        self.capital_proprio + self.bancario_7_anos + self.subsidio_desemprego + self.outros
    }
}

/// Section 10: three-year projections. Each line holds one value per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Projections {
    pub vendas: Vec<f64>,
    pub prestacao_servicos: Vec<f64>,
    pub cmvmc: Vec<f64>,
    pub fse: Vec<f64>,
    pub gastos_pessoal: Vec<f64>,
    pub outros_gastos: Vec<f64>,
}

impl Projections {
    /// Every line paired with its wire name, in form order.
    pub fn lines(&self) -> [(&'static str, &[f64]); 6] {
        [
            ("vendas", self.vendas.as_slice()),
            ("prestacaoServicos", self.prestacao_servicos.as_slice()),
            ("cmvmc", self.cmvmc.as_slice()),
            ("fse", self.fse.as_slice()),
            ("gastosPessoal", self.gastos_pessoal.as_slice()),
            ("outrosGastos", self.outros_gastos.as_slice()),
        ]
    }
}

impl Default for Projections {
    fn default() -> Self {
        let zeros = vec![0.0; PROJECTION_YEARS];
        Self {
            vendas: zeros.clone(),
            prestacao_servicos: zeros.clone(),
            cmvmc: zeros.clone(),
            fse: zeros.clone(),
            gastos_pessoal: zeros.clone(),
            outros_gastos: zeros,
        }
    }
}

// ---------------------------------------------------------------------------
// Whole plan
// ---------------------------------------------------------------------------

/// The full structured business plan being authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessPlan {
    pub sumario_executivo: ExecutiveSummary,
    pub identificacao: Identification,
    pub analise_mercado: MarketAnalysis,
    pub projeto_negocio: BusinessProject,
    pub recursos_humanos: HumanResources,
    pub estrategia: Strategy,
    pub swot: Swot,
    pub investimento: Investment,
    pub financiamento: Financing,
    pub projecoes: Projections,
    pub rececao: Reception,
}

impl BusinessPlan {
    /// A fresh, empty plan whose reception record is stamped with `now`.
    pub fn blank(now: DateTime<Local>) -> Self {
        Self {
            rececao: Reception::stamped(now),
            ..Self::default()
        }
    }

    /// Display name used when persisting: the promoter name, or
    /// [`UNNAMED_PLAN`] when blank.
    pub fn display_name(&self) -> &str {
        let name = self.identificacao.nome_promotor.trim();
        if name.is_empty() { UNNAMED_PLAN } else { name }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row of the `business_plans` table, one JSONB column per section.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: String,
    pub name: String,
    pub sumario_executivo: Json<ExecutiveSummary>,
    pub identificacao: Json<Identification>,
    pub analise_mercado: Json<MarketAnalysis>,
    pub projeto_negocio: Json<BusinessProject>,
    pub recursos_humanos: Json<HumanResources>,
    pub estrategia: Json<Strategy>,
    pub swot: Json<Swot>,
    pub investimento: Json<Investment>,
    pub financiamento: Json<Financing>,
    pub projecoes: Json<Projections>,
    pub rececao: Json<Reception>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted plan as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub data: BusinessPlan,
}

impl From<PlanRow> for PlanRecord {
    /// The row id is authoritative: it is copied into
    /// `identificacao.planId` whatever the stored section says.
    fn from(row: PlanRow) -> Self {
        let mut identificacao = row.identificacao.0;
        identificacao.plan_id = row.id.clone();
        Self {
            data: BusinessPlan {
                sumario_executivo: row.sumario_executivo.0,
                identificacao,
                analise_mercado: row.analise_mercado.0,
                projeto_negocio: row.projeto_negocio.0,
                recursos_humanos: row.recursos_humanos.0,
                estrategia: row.estrategia.0,
                swot: row.swot.0,
                investimento: row.investimento.0,
                financiamento: row.financiamento.0,
                projecoes: row.projecoes.0,
                rececao: row.rececao.0,
            },
            id: row.id,
            name: row.name,
            updated_at: row.updated_at,
        }
    }
}

/// A row of the `ai_cache` table.
#[derive(Debug, Clone, FromRow)]
pub struct CacheRow {
    pub summary_key: String,
    pub generated_data: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
