//! The AI-owned part of a plan and the schema the generator must follow.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use famaplan_db::models::{
    BusinessPlan, BusinessProject, Financing, HumanResources, Investment, MarketAnalysis,
    PROJECTION_YEARS, Projections, Strategy, Swot,
};

use crate::plan::session::assign_member_ids;
use crate::schema::{
    ContentError, array_of, number, number_object, object, string, string_object,
};

/// The first projection line that does not hold exactly one value per
/// projected year, with the number of values it has.
pub fn mismatched_projection_line(projections: &Projections) -> Option<(&'static str, usize)> {
    projections
        .lines()
        .into_iter()
        .find(|(_, values)| values.len() != PROJECTION_YEARS)
        .map(|(line, values)| (line, values.len()))
}

/// The eight sections distillation fills in.
///
/// Identification, reception and the executive summary are not part of it,
/// so merging a payload can never touch them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionPayload {
    pub analise_mercado: MarketAnalysis,
    pub projeto_negocio: BusinessProject,
    pub recursos_humanos: HumanResources,
    pub estrategia: Strategy,
    pub swot: Swot,
    pub investimento: Investment,
    pub financiamento: Financing,
    pub projecoes: Projections,
}

impl SectionPayload {
    /// Checks the schema cannot express: every projection line covers
    /// exactly [`PROJECTION_YEARS`] years.
    pub fn check(&self) -> Result<(), ContentError> {
        match mismatched_projection_line(&self.projecoes) {
            Some((line, years)) => Err(ContentError::Schema {
                path: format!("projecoes.{line}"),
                problem: format!("expected {PROJECTION_YEARS} values, found {years}"),
            }),
            None => Ok(()),
        }
    }

    /// Replace each AI-owned section of `plan` with this payload's version.
    ///
    /// Replacement is per section, not per field. Team members without an
    /// id get a fresh one.
    pub fn merge_into(self, mut plan: BusinessPlan) -> BusinessPlan {
        let Self {
            analise_mercado,
            projeto_negocio,
            mut recursos_humanos,
            estrategia,
            swot,
            investimento,
            financiamento,
            projecoes,
        } = self;

        assign_member_ids(&mut recursos_humanos.membros);

        plan.analise_mercado = analise_mercado;
        plan.projeto_negocio = projeto_negocio;
        plan.recursos_humanos = recursos_humanos;
        plan.estrategia = estrategia;
        plan.swot = swot;
        plan.investimento = investimento;
        plan.financiamento = financiamento;
        plan.projecoes = projecoes;
        plan
    }
}

const STRATEGY_FIELDS: &[&str] = &[
    "fundamentacao",
    "produto",
    "preco",
    "distribuicao",
    "comunicacao",
];

const PROJECTION_LINES: &[&str] = &[
    "vendas",
    "prestacaoServicos",
    "cmvmc",
    "fse",
    "gastosPessoal",
    "outrosGastos",
];

/// Investment fields the generator is asked for. The two `tangiveis*`
/// fields are left to the user.
const GENERATED_INVESTMENT_FIELDS: &[&str] = &[
    "propriedadesTerrenos",
    "propriedadesEdificios",
    "equipamentoBasico",
    "transporte",
    "administrativo",
    "biologico",
    "goodwill",
    "desenvolvimento",
    "software",
    "propriedadeIndustrial",
    "diversos",
    "fundoManeio",
];

pub fn strategy_schema() -> Value {
    string_object(STRATEGY_FIELDS)
}

pub fn projections_schema() -> Value {
    object(
        PROJECTION_LINES
            .iter()
            .map(|line| (*line, array_of(number())))
            .collect(),
        PROJECTION_LINES,
    )
}

/// Schema of a full distillation response.
pub fn distillation_schema() -> Value {
    let member = string_object(&["nome", "funcao", "condicao", "salario"]);
    let string_list = || array_of(string());

    object(
        vec![
            (
                "analiseMercado",
                string_object(&["necessidades", "expectativas", "criteriosCompra", "concorrentes"]),
            ),
            (
                "projetoNegocio",
                string_object(&["objetivos", "acoes", "processo", "instalacoes"]),
            ),
            (
                "recursosHumanos",
                object(
                    vec![("descricao", string()), ("membros", array_of(member))],
                    &["descricao", "membros"],
                ),
            ),
            ("estrategia", strategy_schema()),
            (
                "swot",
                object(
                    vec![
                        ("pontosFortes", string_list()),
                        ("pontosFracos", string_list()),
                        ("oportunidades", string_list()),
                        ("ameacas", string_list()),
                    ],
                    &["pontosFortes", "pontosFracos", "oportunidades", "ameacas"],
                ),
            ),
            ("investimento", number_object(GENERATED_INVESTMENT_FIELDS)),
            (
                "financiamento",
                number_object(&["capitalProprio", "bancario7Anos", "subsidioDesemprego", "outros"]),
            ),
            ("projecoes", projections_schema()),
        ],
        &[
            "analiseMercado",
            "projetoNegocio",
            "recursosHumanos",
            "estrategia",
            "swot",
            "investimento",
            "financiamento",
            "projecoes",
        ],
    )
}

#[cfg(test)]
mod tests {
    use famaplan_db::models::{Identification, TeamMember};
    use serde_json::json;

    use super::*;
    use crate::schema::validate;

    #[test]
    fn merge_replaces_sections_wholesale() {
        let mut plan = BusinessPlan::default();
        plan.identificacao = Identification {
            plan_id: "PN 2024-0003".into(),
            nome_promotor: "Ana Silva".into(),
            ..Identification::default()
        };
        plan.sumario_executivo.atividades = "Padaria artesanal".into();
        plan.swot.ameacas = vec!["old".into()];
        plan.investimento.tangiveis_terrenos = 900.0;

        let payload = SectionPayload {
            swot: Swot {
                pontos_fortes: vec!["new".into()],
                ..Swot::default()
            },
            recursos_humanos: HumanResources {
                descricao: "Equipa".into(),
                membros: vec![TeamMember {
                    nome: "Rui".into(),
                    ..TeamMember::default()
                }],
            },
            ..SectionPayload::default()
        };

        let merged = payload.merge_into(plan);
        assert_eq!(merged.identificacao.plan_id, "PN 2024-0003");
        assert_eq!(merged.identificacao.nome_promotor, "Ana Silva");
        assert_eq!(merged.sumario_executivo.atividades, "Padaria artesanal");
        assert_eq!(merged.swot.pontos_fortes, vec!["new".to_string()]);
        assert!(merged.swot.ameacas.is_empty());
        assert_eq!(merged.investimento.tangiveis_terrenos, 0.0);
        assert!(!merged.recursos_humanos.membros[0].id.is_empty());
    }

    #[test]
    fn serialized_payload_satisfies_schema() {
        let payload = SectionPayload {
            recursos_humanos: HumanResources {
                descricao: String::new(),
                membros: vec![TeamMember::default()],
            },
            ..SectionPayload::default()
        };
        let value = serde_json::to_value(&payload).unwrap();
        validate(&value, &distillation_schema()).unwrap();
    }

    #[test]
    fn schema_omits_tangible_investment_fields() {
        let schema = distillation_schema();
        let props = &schema["properties"]["investimento"]["properties"];
        assert!(props.get("software").is_some());
        assert!(props.get("tangiveisTerrenos").is_none());
        assert!(props.get("tangiveisEdificios").is_none());
        assert_eq!(
            schema["required"],
            json!([
                "analiseMercado",
                "projetoNegocio",
                "recursosHumanos",
                "estrategia",
                "swot",
                "investimento",
                "financiamento",
                "projecoes"
            ])
        );
    }
}
