use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::{load_story, ContentClient};
use crate::app::{AppRemote, AppStopped, Command};
use crate::view::{compose_story, PageSettings};

/// How long `/frame` waits for a newer render before answering 204.
pub const FRAME_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Response header carrying the sequence number of a delivered frame.
pub const FRAME_SEQUENCE_HEADER: &str = "x-frame-sequence";

pub struct AppState {
    pub remote: AppRemote,
    pub client: ContentClient,
    pub settings: Arc<PageSettings>,
    pub poll_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/frame", get(next_frame))
        .route("/story", get(story))
        .route("/resize", post(resize))
        .route("/section", post(select_section))
        .route("/refresh", post(refresh))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let frame = state.remote.current_frame();
    Html(frame.html.clone())
}

#[derive(Deserialize)]
pub struct FrameQuery {
    #[serde(default)]
    pub after: u64,
}

/// Long-poll for the first frame newer than `after`.
pub async fn next_frame(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FrameQuery>,
) -> Result<Response, AppError> {
    let mut frames = state.remote.frames();
    let newer = tokio::time::timeout(
        state.poll_timeout,
        frames.wait_for(|frame| frame.sequence > query.after),
    )
    .await;

    let frame = match newer {
        Ok(Ok(frame)) => frame.clone(),
        Ok(Err(_)) => return Err(AppStopped.into()),
        Err(_) => return Ok(StatusCode::NO_CONTENT.into_response()),
    };

    Ok((
        [(FRAME_SEQUENCE_HEADER, frame.sequence.to_string())],
        Html(frame.html.clone()),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct ResizeQuery {
    pub width: f64,
}

pub async fn resize(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResizeQuery>,
) -> Result<impl IntoResponse, AppError> {
    state
        .remote
        .send(Command::Resize { width: query.width })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct SectionForm {
    #[serde(default)]
    pub section: String,
}

impl SectionForm {
    /// Empty selects every section; anything unparseable is treated the same way.
    fn section_id(&self) -> Option<u64> {
        let raw = self.section.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring malformed section value {:?}", raw);
                None
            }
        }
    }
}

pub async fn select_section(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SectionForm>,
) -> Result<impl IntoResponse, AppError> {
    state
        .remote
        .send(Command::SelectSection {
            section: form.section_id(),
        })
        .await?;
    Ok(Redirect::to("/"))
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    state.remote.send(Command::Refresh).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct StoryQuery {
    #[serde(default)]
    pub id: Option<String>,
}

pub async fn story(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoryQuery>,
) -> impl IntoResponse {
    let id = query.id.as_deref().and_then(|raw| raw.trim().parse::<u64>().ok());
    let loaded = match id {
        Some(id) => load_story(&state.client, id).await,
        None => {
            warn!("Story view requested without a valid id: {:?}", query.id);
            None
        }
    };

    let frame = state.remote.current_frame();
    let page = {
        let mut rng = rand::thread_rng();
        compose_story(
            loaded
                .as_ref()
                .map(|(article, image)| (article, image.as_deref())),
            &state.settings,
            frame.section,
            frame.scale,
            Utc::now(),
            &mut rng,
        )
    };
    HtmlTemplate(page)
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
