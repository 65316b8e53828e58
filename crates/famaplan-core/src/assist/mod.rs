//! One-off writing aids: drafting a single section, regenerating the
//! strategy, and producing three-year projections from the whole plan.
//!
//! Unlike distillation these are never cached and never touch a plan; the
//! caller decides whether to apply what comes back.

use thiserror::Error;
use tracing::debug;

use famaplan_db::models::{BusinessPlan, PROJECTION_YEARS, Projections, Strategy};

use crate::distill::payload::{mismatched_projection_line, projections_schema, strategy_schema};
use crate::generator::{GenerateRequest, Generator, GeneratorError, ModelTier};
use crate::schema::{ContentError, parse_structured};

pub const ASSIST_TEMPERATURE: f64 = 0.0;
pub const STRATEGY_TEMPERATURE: f64 = 0.3;
pub const PROJECTIONS_TEMPERATURE: f64 = 0.1;

/// Months of salary paid per year (twelve plus holiday and Christmas pay).
const SALARY_MONTHS: f64 = 14.0;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(
        "projection line {line} has {years} values, expected {expected}",
        expected = PROJECTION_YEARS
    )]
    IncompleteProjections { line: &'static str, years: usize },
}

/// Draft professional text for one section from the user's notes.
pub async fn assist_writing(
    generator: &dyn Generator,
    section_title: &str,
    notes: &str,
) -> Result<String, AssistError> {
    let prompt = format!(
        "Atua como consultor de negócios sénior. Ajuda a redigir a secção \"{section_title}\" \
         de um plano de negócios oficial para a Câmara Municipal de Vila Nova de Famalicão.\n\
         Notas do utilizador: \"{notes}\"\n\
         Escreve um texto profissional, conciso e estruturado, em Português de Portugal."
    );
    let request = GenerateRequest::text(prompt, ASSIST_TEMPERATURE, ModelTier::Flash);
    let text = generator.generate(&request).await?;
    debug!(section = section_title, chars = text.len(), "drafted section text");
    Ok(text)
}

/// Generate only the strategy section from an executive summary.
pub async fn generate_strategy(
    generator: &dyn Generator,
    summary: &str,
) -> Result<Strategy, AssistError> {
    let prompt = format!(
        "Com base no sumário executivo \"{summary}\", fundamenta a estratégia do negócio: \
         vantagem competitiva, posicionamento do produto, estratégia de preço, canais de \
         distribuição e plano de comunicação.\n\
         Usa Português de Portugal e responde em JSON."
    );
    let schema = strategy_schema();
    let request =
        GenerateRequest::structured(prompt, schema.clone(), STRATEGY_TEMPERATURE, ModelTier::Flash);
    let text = generator.generate(&request).await?;
    let value = parse_structured(&text, &schema)?;
    Ok(serde_json::from_value(value).map_err(ContentError::Json)?)
}

fn projections_prompt(plan: &BusinessPlan) -> String {
    let payroll = plan.recursos_humanos.monthly_payroll();
    format!(
        "Atua como analista financeiro. Gera projeções para os próximos {PROJECTION_YEARS} anos \
         (Ano 1 a Ano {PROJECTION_YEARS}) a partir dos dados do plano.\n\n\
         DADOS DO PLANO:\n\
         - Atividade: {activity}\n\
         - Investimento total previsto: {investment:.2}€\n\
         - Recursos humanos: {hr}. Total mensal de salários: {payroll:.2}€ \
         ({annual:.2}€ por ano a {SALARY_MONTHS} meses)\n\
         - Estratégia de preço: {pricing}\n\n\
         REGRAS:\n\
         1. Os gastos com pessoal devem corresponder aos salários indicados, \
         multiplicando o total mensal por {SALARY_MONTHS} meses.\n\
         2. As vendas crescem gradualmente do primeiro ao último ano (cerca de 15-20% ao ano).\n\
         3. O CMVMC é uma percentagem das vendas adequada ao setor.\n\
         4. Os FSE incluem rendas, marketing e energia.\n\n\
         Responde apenas com JSON, com exatamente {PROJECTION_YEARS} números por linha.",
        activity = plan.sumario_executivo.atividades,
        investment = plan.investimento.total(),
        hr = plan.recursos_humanos.descricao,
        annual = payroll * SALARY_MONTHS,
        pricing = plan.estrategia.preco,
    )
}

/// Generate three-year projections from the whole plan.
pub async fn generate_projections(
    generator: &dyn Generator,
    plan: &BusinessPlan,
) -> Result<Projections, AssistError> {
    let schema = projections_schema();
    let request = GenerateRequest::structured(
        projections_prompt(plan),
        schema.clone(),
        PROJECTIONS_TEMPERATURE,
        ModelTier::Pro,
    );
    let text = generator.generate(&request).await?;
    let value = parse_structured(&text, &schema)?;
    let projections: Projections = serde_json::from_value(value).map_err(ContentError::Json)?;

    if let Some((line, years)) = mismatched_projection_line(&projections) {
        return Err(AssistError::IncompleteProjections { line, years });
    }
    Ok(projections)
}

#[cfg(test)]
mod tests {
    use famaplan_db::models::TeamMember;

    use super::*;

    #[test]
    fn projections_prompt_summarizes_plan() {
        let mut plan = BusinessPlan::default();
        plan.sumario_executivo.atividades = "Oficina de bicicletas".into();
        plan.investimento.software = 1000.0;
        plan.investimento.transporte = 500.0;
        plan.estrategia.preco = "Preço médio".into();
        plan.recursos_humanos.membros = vec![
            TeamMember {
                salario: "1000".into(),
                ..TeamMember::default()
            },
            TeamMember {
                salario: "900".into(),
                ..TeamMember::default()
            },
        ];

        let prompt = projections_prompt(&plan);
        assert!(prompt.contains("Oficina de bicicletas"));
        assert!(prompt.contains("1500.00€"));
        assert!(prompt.contains("1900.00€"));
        assert!(prompt.contains("26600.00€"));
        assert!(prompt.contains("Preço médio"));
    }
}
