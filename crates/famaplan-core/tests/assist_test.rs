//! Tests for the writing aids: request parameters and response validation.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use famaplan_core::assist::{
    AssistError, assist_writing, generate_projections, generate_strategy,
};
use famaplan_core::generator::{GenerateRequest, Generator, GeneratorError, ModelTier};
use famaplan_core::schema::ContentError;
use famaplan_db::models::BusinessPlan;

/// Generator that always answers with the same text and remembers the
/// last request it saw.
struct FixedGenerator {
    answer: Result<String, u16>,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl FixedGenerator {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            answer: Ok(text.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            answer: Err(status),
            seen: Mutex::new(Vec::new()),
        }
    }

    async fn last(&self) -> GenerateRequest {
        self.seen.lock().await.last().cloned().unwrap()
    }
}

#[async_trait]
impl Generator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, GeneratorError> {
        self.seen.lock().await.push(request.clone());
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(GeneratorError::Api {
                status: *status,
                message: "unavailable".into(),
            }),
        }
    }
}

#[tokio::test]
async fn assist_writing_uses_fast_deterministic_model() {
    let generator = FixedGenerator::ok("Texto profissional.");
    let text = assist_writing(&generator, "Análise de Mercado", "clientes locais")
        .await
        .unwrap();
    assert_eq!(text, "Texto profissional.");

    let request = generator.last().await;
    assert_eq!(request.tier, ModelTier::Flash);
    assert_eq!(request.temperature, 0.0);
    assert!(request.response_schema.is_none());
    assert!(request.prompt.contains("\"Análise de Mercado\""));
    assert!(request.prompt.contains("clientes locais"));
}

#[tokio::test]
async fn assist_writing_propagates_failure() {
    let generator = FixedGenerator::failing(500);
    let err = assist_writing(&generator, "SWOT", "notas").await.unwrap_err();
    assert!(matches!(err, AssistError::Generator(GeneratorError::Api { status: 500, .. })));
}

#[tokio::test]
async fn strategy_is_parsed_and_validated() {
    let generator = FixedGenerator::ok(
        json!({
            "fundamentacao": "Proximidade",
            "produto": "Pão",
            "preco": "Médio",
            "distribuicao": "Loja",
            "comunicacao": "Instagram"
        })
        .to_string(),
    );
    let strategy = generate_strategy(&generator, "Padaria").await.unwrap();
    assert_eq!(strategy.comunicacao, "Instagram");

    let request = generator.last().await;
    assert_eq!(request.temperature, 0.3);
    assert_eq!(request.tier, ModelTier::Flash);
    assert!(request.response_schema.is_some());
}

#[tokio::test]
async fn strategy_missing_field_is_rejected() {
    let generator = FixedGenerator::ok(json!({ "fundamentacao": "x" }).to_string());
    let err = generate_strategy(&generator, "Padaria").await.unwrap_err();
    assert!(matches!(err, AssistError::Content(ContentError::Schema { .. })));
}

fn projections(years: usize) -> String {
    let line = vec![1000.0; years];
    json!({
        "vendas": line,
        "prestacaoServicos": [0, 0, 0],
        "cmvmc": [300, 330, 360],
        "fse": [200, 200, 200],
        "gastosPessoal": [14000, 14000, 14500],
        "outrosGastos": [50, 50, 50]
    })
    .to_string()
}

#[tokio::test]
async fn projections_need_three_years_per_line() {
    let mut plan = BusinessPlan::default();
    plan.sumario_executivo.atividades = "Padaria".into();

    let ok = generate_projections(&FixedGenerator::ok(projections(3)), &plan)
        .await
        .unwrap();
    assert_eq!(ok.vendas, vec![1000.0; 3]);
    assert_eq!(ok.gastos_pessoal, vec![14000.0, 14000.0, 14500.0]);

    let err = generate_projections(&FixedGenerator::ok(projections(2)), &plan)
        .await
        .unwrap_err();
    match err {
        AssistError::IncompleteProjections { line, years } => {
            assert_eq!(line, "vendas");
            assert_eq!(years, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn projections_use_pro_model_at_low_temperature() {
    let generator = FixedGenerator::ok(projections(3));
    generate_projections(&generator, &BusinessPlan::default())
        .await
        .unwrap();

    let request = generator.last().await;
    assert_eq!(request.tier, ModelTier::Pro);
    assert_eq!(request.temperature, 0.1);
    let schema = request.response_schema.unwrap();
    assert_eq!(schema["required"].as_array().unwrap().len(), 6);
}
