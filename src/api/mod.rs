mod cli;
mod input;

use axum::{
    Router,
    extract::{Form, Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    Clock, CoreError, PlanInputs, RateSearchConfig, RateSolution, SystemClock, YearlyRecord,
    project_yearly, solve_with_config,
};

pub use cli::{Cli, Command, PlanArgs, ServeArgs, run_cli};
pub use input::{
    FieldValue, InputError, PlanPayload, build_plan, parse_birth_year, parse_checkbox,
    parse_decimal,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

pub const UNSOLVABLE_MESSAGE: &str = "No achievable return rate found within the search bounds.";

#[derive(Clone)]
struct AppState {
    clock: Arc<dyn Clock + Send + Sync>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub solved: bool,
    pub required_return_rate: Option<f64>,
    pub message: String,
    pub iterations: usize,
    pub years: Vec<YearlyRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Solves the plan and, when a rate exists, projects it year by year at the
/// rounded rate shown to the user.
pub fn evaluate_plan(plan: &PlanInputs) -> Result<PlanResponse, CoreError> {
    let report = solve_with_config(plan, RateSearchConfig::default())?;
    match report.solution {
        RateSolution::Unsolvable => Ok(PlanResponse {
            solved: false,
            required_return_rate: None,
            message: UNSOLVABLE_MESSAGE.to_string(),
            iterations: report.iterations.len(),
            years: Vec::new(),
        }),
        RateSolution::Solved {
            annual_rate_percent,
            ..
        } => Ok(PlanResponse {
            solved: true,
            required_return_rate: Some(annual_rate_percent),
            message: report.message,
            iterations: report.iterations.len(),
            years: project_yearly(plan, annual_rate_percent)?,
        }),
    }
}

pub fn router() -> Router {
    router_with_clock(Arc::new(SystemClock))
}

fn router_with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .route("/api/plan/form", post(plan_form_handler))
        .fallback(not_found_handler)
        .with_state(AppState { clock })
}

pub async fn run_http_server(host: [u8; 4], port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from((host, port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fire-plan HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<PlanPayload>,
) -> Response {
    plan_handler_impl(&payload, state.clock.as_ref())
}

async fn plan_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    plan_handler_impl(&payload, state.clock.as_ref())
}

async fn plan_form_handler(
    State(state): State<AppState>,
    Form(payload): Form<PlanPayload>,
) -> Response {
    plan_handler_impl(&payload, state.clock.as_ref())
}

fn plan_handler_impl(payload: &PlanPayload, clock: &(dyn Clock + Send + Sync)) -> Response {
    match plan_response_from_payload(payload, clock) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(PlanError::Input(e)) => {
            warn!(error = %e, "rejected plan input");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(PlanError::Core(e @ CoreError::InvalidPlan(_))) => {
            warn!(error = %e, "rejected plan");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(PlanError::Core(e)) => {
            error!(error = %e, "plan evaluation hit an internal invariant");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum PlanError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

fn plan_response_from_payload(
    payload: &PlanPayload,
    clock: &(dyn Clock + Send + Sync),
) -> Result<PlanResponse, PlanError> {
    let plan = build_plan(payload, clock)?;
    let response = evaluate_plan(&plan)?;
    info!(
        solved = response.solved,
        rate = ?response.required_return_rate,
        years = response.years.len(),
        "evaluated plan"
    );
    Ok(response)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;

    fn sample_payload() -> PlanPayload {
        let text = |s: &str| Some(FieldValue::Text(s.to_string()));
        PlanPayload {
            dob: Some("1985-03-01".to_string()),
            birth_year: None,
            retirement_age: text("65"),
            life_expectancy: text("90"),
            current_assets: text("0"),
            current_salary: text("40000"),
            monthly_investment: text("500"),
            required_pension: text("2000"),
            salary_growth_rate: text("3"),
            continue_investment: None,
        }
    }

    #[test]
    fn solved_plan_response_carries_rate_and_full_projection() {
        let response =
            plan_response_from_payload(&sample_payload(), &FixedClock(2025)).expect("response");
        assert!(response.solved);
        assert_eq!(response.required_return_rate, Some(4.61));
        assert_eq!(response.years.len(), 51);
        assert_eq!(response.iterations, 19);
    }

    #[test]
    fn unsolvable_plan_response_has_message_and_no_years() {
        let mut payload = sample_payload();
        payload.retirement_age = Some(FieldValue::Text("40".to_string()));
        payload.required_pension = Some(FieldValue::Text("100000".to_string()));

        let response =
            plan_response_from_payload(&payload, &FixedClock(2025)).expect("response");
        assert!(!response.solved);
        assert_eq!(response.required_return_rate, None);
        assert_eq!(response.message, UNSOLVABLE_MESSAGE);
        assert!(response.years.is_empty());
    }

    #[test]
    fn invalid_input_is_an_input_error() {
        let mut payload = sample_payload();
        payload.current_assets = Some(FieldValue::Text("lots".to_string()));
        let err = plan_response_from_payload(&payload, &FixedClock(2025)).expect_err("must reject");
        assert!(matches!(err, PlanError::Input(InputError::NotANumber { .. })));
    }

    #[test]
    fn plan_response_serialization_uses_camel_case() {
        let response =
            plan_response_from_payload(&sample_payload(), &FixedClock(2025)).expect("response");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"requiredReturnRate\":4.61"));
        assert!(json.contains("\"years\""));
        assert!(json.contains("\"startingAssets\""));
        assert!(json.contains("\"annualAfterTaxWithdrawal\""));
        assert!(json.contains("\"endingAssets\""));
    }

    #[test]
    fn error_responses_map_to_status_codes() {
        let mut payload = sample_payload();
        payload.dob = Some("someday".to_string());
        let response = plan_handler_impl(&payload, &FixedClock(2025));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = plan_handler_impl(&sample_payload(), &FixedClock(2025));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }
}
