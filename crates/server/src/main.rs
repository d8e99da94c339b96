use std::{net::SocketAddr, sync::Arc, time::Duration};

use assistant::{FaqMatcher, OpenAiClient, RateCardEstimator};
use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use server_api::{
    end_chat, estimate_cost, general_query, initiate_call, start_chat, voice_greeting,
    voice_turn, ApiContext,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        ChatReply, EndChatRequest, EndChatResponse, EstimateCostRequest, EstimateCostResponse,
        GeneralQueryRequest, InitiateCallRequest, InitiateCallResponse, StartChatResponse,
        VoiceWebhook,
    },
};
use storage::Storage;
use telephony::{twiml::TWIML_CONTENT_TYPE, TwilioClient};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod sweeper;

use app_state::AppState;
use config::{check_public_url, load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;
const CALL_FORM_PAGE: &str = include_str!("../static/index.html");

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let public_url = check_public_url(&settings.server_public_url).unwrap_or_else(|error| {
        warn!(%error, "voice callbacks will not reach this server");
        settings.server_public_url.clone()
    });
    if let Err(error) = settings.twilio.check() {
        warn!(%error, "outbound calls will fail until Twilio is configured");
    }
    let telephony = Arc::new(TwilioClient::new(settings.twilio.clone()));
    let model = Arc::new(OpenAiClient::new(settings.openai.clone()));
    let faq = match FaqMatcher::load(
        &settings.faq_dataset_path,
        &settings.faq_cache_path,
        model.as_ref(),
    )
    .await
    {
        Ok(faq) if faq.is_empty() => {
            warn!(path = %settings.faq_dataset_path.display(), "FAQ dataset has no entries");
            faq
        }
        Ok(faq) => {
            info!(entries = faq.len(), "FAQ answers loaded");
            faq
        }
        Err(error) => {
            warn!(
                %error,
                path = %settings.faq_dataset_path.display(),
                "FAQ answers disabled"
            );
            FaqMatcher::default()
        }
    };

    let api = ApiContext {
        storage: storage.clone(),
        telephony,
        model,
        estimator: Arc::new(RateCardEstimator::default()),
        faq: Arc::new(faq),
        public_url: public_url.clone(),
    };

    sweeper::spawn(
        storage,
        settings.session_ttl_hours,
        Duration::from_secs(settings.sweep_interval_secs.max(1)),
    );

    let app = build_router(Arc::new(AppState { api }));
    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, %public_url, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(call_form))
        .route("/healthz", get(healthz))
        .route("/initiate_call", post(http_initiate_call))
        .route("/start_chat", post(http_start_chat))
        .route("/end_chat", post(http_end_chat))
        .route("/general_query", post(http_general_query))
        .route("/estimate_cost", post(http_estimate_cost))
        .route("/voice", post(http_voice))
        .route(server_api::VOICE_INPUT_ROUTE, post(http_voice_input))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

async fn call_form() -> Html<&'static str> {
    Html(CALL_FORM_PAGE)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        http_error(ApiError::new(ErrorCode::Internal, e.to_string()))
    })?;
    Ok("ok")
}

async fn http_initiate_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitiateCallRequest>,
) -> Result<Json<InitiateCallResponse>, HttpError> {
    let response = initiate_call(&state.api, req.phone_number.as_deref())
        .await
        .map_err(http_error)?;
    Ok(Json(response))
}

async fn http_start_chat(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StartChatResponse>, HttpError> {
    let response = start_chat(&state.api).await.map_err(http_error)?;
    Ok(Json(response))
}

async fn http_end_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EndChatRequest>,
) -> Result<Json<EndChatResponse>, HttpError> {
    let response = end_chat(&state.api, req.chat_id.as_deref())
        .await
        .map_err(http_error)?;
    Ok(Json(response))
}

async fn http_general_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GeneralQueryRequest>,
) -> Result<Json<ChatReply>, HttpError> {
    let reply = general_query(&state.api, &req).await.map_err(http_error)?;
    Ok(Json(reply))
}

async fn http_estimate_cost(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EstimateCostRequest>,
) -> Result<Json<EstimateCostResponse>, HttpError> {
    let response = estimate_cost(&state.api, &req).await.map_err(http_error)?;
    Ok(Json(response))
}

async fn http_voice(
    State(state): State<Arc<AppState>>,
    Form(hook): Form<VoiceWebhook>,
) -> Result<impl IntoResponse, HttpError> {
    let xml = voice_greeting(&state.api, &hook).await.map_err(http_error)?;
    Ok(twiml(xml))
}

async fn http_voice_input(
    State(state): State<Arc<AppState>>,
    Form(hook): Form<VoiceWebhook>,
) -> Result<impl IntoResponse, HttpError> {
    let xml = voice_turn(&state.api, &hook).await.map_err(http_error)?;
    Ok(twiml(xml))
}

fn twiml(xml: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], xml)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
