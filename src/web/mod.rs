mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dashboard::{Dashboard, DashboardError, DashboardFrame},
    geo::FishermanUpdate,
    identity::{IdentityClient, IdentityError},
    map::{MapError, MemoryMap},
    session::{ScreenRouter, View},
    store::GeoStateStore,
    tracker::{initial_state, Clock, LocationSource, SimulatedTracker, SystemClock},
};

pub struct Session {
    router: ScreenRouter,
    dashboard: Dashboard<MemoryMap>,
    latest: Option<DashboardFrame>,
}

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<Session>>,
    broadcaster: broadcast::Sender<String>,
    identity: IdentityClient,
}

impl AppState {
    pub fn new(config: &AppConfig, clock: &impl Clock) -> Result<Self> {
        let store = GeoStateStore::new(initial_state(config, clock), config.risk_zones.clone())
            .context("invalid start state")?;
        let mut backend = MemoryMap::new();
        backend.mount(config.map.container.as_str());
        let dashboard = Dashboard::new(
            store,
            config.risk,
            backend,
            config.map.container.as_str(),
            config.map.zoom,
        );
        let (broadcaster, _) = broadcast::channel::<String>(256);
        Ok(Self {
            session: Arc::new(Mutex::new(Session {
                router: ScreenRouter::new(),
                dashboard,
                latest: None,
            })),
            broadcaster,
            identity: IdentityClient::new(config.identity.base_url.as_str()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &mut Session, frame: DashboardFrame) {
        match serde_json::to_string(&frame) {
            Ok(payload) => {
                let _ = self.broadcaster.send(payload);
            }
            Err(err) => warn!("frame {} not serialisable: {err}", frame.sequence),
        }
        session.latest = Some(frame);
    }

    /// Feeds one update into the dashboard if it is showing.
    pub fn apply_location(&self, update: FishermanUpdate) -> Result<DashboardFrame, WebError> {
        let mut session = self.lock();
        if !session.router.is_dashboard() {
            return Err(WebError::WrongView(session.router.view()));
        }
        let frame = session.dashboard.apply(update)?;
        self.publish(&mut session, frame.clone());
        Ok(frame)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum WebError {
    WrongView(View),
    Dashboard(DashboardError),
    Identity(IdentityError),
}

impl From<DashboardError> for WebError {
    fn from(value: DashboardError) -> Self {
        WebError::Dashboard(value)
    }
}

impl From<IdentityError> for WebError {
    fn from(value: IdentityError) -> Self {
        WebError::Identity(value)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            WebError::WrongView(view) => (
                StatusCode::CONFLICT,
                "WRONG_VIEW",
                format!("not available from {view:?}"),
            ),
            WebError::Dashboard(DashboardError::Geo(err)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_LOCATION",
                err.to_string(),
            ),
            WebError::Dashboard(DashboardError::Map(MapError::InvalidLocation)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_LOCATION",
                MapError::InvalidLocation.to_string(),
            ),
            WebError::Dashboard(DashboardError::Map(err)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "MAP_ERROR", err.to_string())
            }
            WebError::Identity(err) => {
                let status = match &err {
                    IdentityError::Rejected { status, .. } => *status,
                    _ => StatusCode::BAD_GATEWAY,
                };
                warn!("identity call failed: {err}");
                (status, "IDENTITY_ERROR", err.user_message())
            }
        };
        let body = ApiError {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub view: View,
    pub frame: Option<DashboardFrame>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct FormReply {
    pub message: String,
    pub view: View,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/styles.css", get(styles))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/events", get(stream_events))
        .route("/api/location", post(update_location))
        .route("/api/view/toggle", post(toggle_view))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .with_state(state)
}

/// Drives the simulated location feed while the dashboard is showing.
pub fn spawn_tracker<S>(state: AppState, mut source: S, every: Duration)
where
    S: LocationSource + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let current = {
                let session = state.lock();
                if !session.dashboard.is_mounted() {
                    continue;
                }
                *session.dashboard.state()
            };
            let Some(update) = source.next_update(&current) else {
                debug!("location source exhausted");
                break;
            };
            if let Err(err) = state.apply_location(update) {
                debug!("simulated update skipped: {err:?}");
            }
        }
    });
}

pub async fn run(config: AppConfig) -> Result<()> {
    let state = AppState::new(&config, &SystemClock)?;

    if config.tracker.interval_secs > 0 {
        let tracker = SimulatedTracker::from_config(&config, SystemClock);
        spawn_tracker(
            state.clone(),
            tracker,
            Duration::from_secs(config.tracker.interval_secs),
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port)
        .parse()
        .with_context(|| format!("invalid address {}:{}", config.web.host, config.web.port))?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "TurtleScape live at http://{} (identity service {})",
        addr, config.identity.base_url
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down TurtleScape...");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        assets::STYLES_CSS,
    )
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        assets::APP_JS,
    )
}

async fn latest_state(State(state): State<AppState>) -> Json<StateEnvelope> {
    let session = state.lock();
    let view = session.router.view();
    let frame = if view == View::Dashboard {
        session.latest.clone()
    } else {
        None
    };
    Json(StateEnvelope { view, frame })
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

async fn update_location(
    State(state): State<AppState>,
    Json(update): Json<FishermanUpdate>,
) -> Result<Json<DashboardFrame>, WebError> {
    state.apply_location(update).map(Json)
}

async fn toggle_view(State(state): State<AppState>) -> Json<StateEnvelope> {
    let view = state.lock().router.toggle();
    Json(StateEnvelope { view, frame: None })
}

async fn register(
    State(state): State<AppState>,
    Json(form): Json<Credentials>,
) -> Result<Json<FormReply>, WebError> {
    let reply = state.identity.register(&form.username, &form.phone).await?;
    info!("registered '{}'", form.username);
    Ok(Json(FormReply {
        message: reply.message,
        view: state.lock().router.view(),
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(form): Json<Credentials>,
) -> Result<Json<FormReply>, WebError> {
    let reply = state.identity.login(&form.username, &form.phone).await?;

    let mut session = state.lock();
    if session.router.login_succeeded().is_err() {
        return Err(WebError::WrongView(session.router.view()));
    }
    let frame = match session.dashboard.mount() {
        Ok(frame) => frame,
        Err(err) => {
            let _ = session.router.logout();
            return Err(err.into());
        }
    };
    state.publish(&mut session, frame);
    info!("'{}' logged in", form.username);
    Ok(Json(FormReply {
        message: reply.banner(),
        view: session.router.view(),
    }))
}

async fn logout(State(state): State<AppState>) -> Result<Json<StateEnvelope>, WebError> {
    let mut session = state.lock();
    if session.router.logout().is_err() {
        return Err(WebError::WrongView(session.router.view()));
    }
    session.dashboard.unmount()?;
    session.latest = None;
    Ok(Json(StateEnvelope {
        view: session.router.view(),
        frame: None,
    }))
}
