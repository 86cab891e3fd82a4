use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Extension, Path, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use monty::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 7654;

type ApiResult<T> = std::result::Result<T, ApiError>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = match std::env::var("MONTY_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::new([0, 0, 0, 0].into(), port);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/stats", get(list_stats).post(report_stats))
        .route("/api/stats/:profile", get(stats_summary))
        .route("/api/simulations", post(start_simulation))
        .route(
            "/api/simulations/:id",
            get(simulation_status).delete(cancel_simulation),
        )
        .layer(Extension(Server::default()))
        .layer(TraceLayer::new_for_http());

    info!(%addr, "monty server listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

#[derive(Clone)]
struct Server {
    stats: Arc<dyn StatsRepository>,
    simulations: Arc<DashMap<Uuid, SimulationHandle>>,
    default_settings: Settings,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            stats: Arc::new(MemoryStats::new()),
            simulations: Default::default(),
            default_settings: Settings::default(),
        }
    }
}

#[derive(Debug)]
struct SimulationHandle {
    progress: Progress,
    result: Option<SimulationResult>,
    cancel: CancelFlag,
}

#[derive(thiserror::Error, Debug, Serialize, Deserialize)]
enum ServerError {
    #[error("Simulation not found: {}", .id)]
    SimulationNotFound { id: Uuid },
    #[error("Bad request: {}", .reason)]
    BadRequest { reason: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "resp")]
enum ApiError {
    GameError { cause: Error },
    ServerError { cause: ServerError },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::GameError { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServerError {
                cause: ServerError::SimulationNotFound { .. },
            } => StatusCode::NOT_FOUND,
            ApiError::ServerError { .. } => StatusCode::BAD_REQUEST,
        };
        (status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(cause: Error) -> Self {
        ApiError::GameError { cause }
    }
}

async fn list_stats(Extension(server): Extension<Server>) -> Json<Vec<RoundReport>> {
    Json(server.stats.list_results())
}

#[derive(Debug, Serialize)]
struct StatAdded {
    message: &'static str,
    stats: RoundReport,
}

async fn report_stats(
    Extension(server): Extension<Server>,
    Json(record): Json<RoundReport>,
) -> impl IntoResponse {
    server.stats.report(record.clone());
    (
        StatusCode::CREATED,
        Json(StatAdded {
            message: "New stat added",
            stats: record,
        }),
    )
}

async fn stats_summary(
    Path(profile): Path<ProfileKind>,
    Extension(server): Extension<Server>,
) -> Json<StatsSummary> {
    let records = server.stats.list_results();
    Json(StatsSummary::calculate(profile.name(), &records))
}

#[derive(Debug, Deserialize)]
struct SimulationRequest {
    profile: ProfileKind,
    custom: Option<CustomConfig>,
    settings: Option<Settings>,
}

#[derive(Debug, Serialize)]
struct SimulationStatus {
    id: Uuid,
    progress: Progress,
    result: Option<SimulationResult>,
}

async fn start_simulation(
    Extension(server): Extension<Server>,
    Json(request): Json<SimulationRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = Profile::from_kind(request.profile, request.custom)?;
    let settings = request.settings.unwrap_or(server.default_settings);
    let simulator = Simulator::from_settings(profile, &settings)?;

    let id = Uuid::new_v4();
    let cancel = CancelFlag::new();
    let progress = simulator.progress();
    server.simulations.insert(
        id,
        SimulationHandle {
            progress,
            result: None,
            cancel: cancel.clone(),
        },
    );
    info!(%id, profile = request.profile.name(), trials = settings.trials, "simulation started");

    let simulations = server.simulations.clone();
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let result = simulator
            .run_async(&mut rng, &cancel, |progress| {
                if let Some(mut handle) = simulations.get_mut(&id) {
                    handle.progress = *progress;
                }
            })
            .await;
        match result {
            Ok(result) => {
                if let Some(mut handle) = simulations.get_mut(&id) {
                    handle.result = Some(result);
                }
            }
            Err(e) => error!(%id, "simulation failed: {e}"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SimulationStatus {
            id,
            progress,
            result: None,
        }),
    ))
}

async fn simulation_status(
    Path(id): Path<Uuid>,
    Extension(server): Extension<Server>,
) -> ApiResult<Json<SimulationStatus>> {
    server.take_status(id).map(Json)
}

async fn cancel_simulation(
    Path(id): Path<Uuid>,
    Extension(server): Extension<Server>,
) -> ApiResult<impl IntoResponse> {
    let handle = server
        .simulations
        .get(&id)
        .ok_or_else(|| simulation_not_found(id))?;
    handle.cancel.cancel();
    Ok((
        StatusCode::ACCEPTED,
        Json(SimulationStatus {
            id,
            progress: handle.progress,
            result: handle.result,
        }),
    ))
}

fn simulation_not_found(id: Uuid) -> ApiError {
    ApiError::ServerError {
        cause: ServerError::SimulationNotFound { id },
    }
}

impl Server {
    /// 查询模拟状态，已结束的模拟在结果被读取后移除
    fn take_status(&self, id: Uuid) -> ApiResult<SimulationStatus> {
        let status = {
            let handle = self
                .simulations
                .get(&id)
                .ok_or_else(|| simulation_not_found(id))?;
            SimulationStatus {
                id,
                progress: handle.progress,
                result: handle.result,
            }
        };
        if status.result.is_some() {
            self.simulations.remove(&id);
            info!(%id, "simulation result collected");
        }
        Ok(status)
    }
}

async fn ws_handler(ws: WebSocketUpgrade, Extension(server): Extension<Server>) -> impl IntoResponse {
    ws.on_upgrade(|s| async move {
        if let Err(e) = handle_ws(s, server).await {
            warn!("Websocket error: {e}");
        }
    })
}

/// 一个连接上的交互式游戏，本轮游戏只归这个连接所有
struct Session {
    id: Uuid,
    round: Option<Round>,
    /// 主持人行为是否对挑战者隐藏
    hidden: bool,
    rng: StdRng,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            round: None,
            hidden: false,
            rng: StdRng::from_entropy(),
        }
    }

    fn handle(&mut self, request: GameRequest, server: &Server) -> GameResponse {
        match self.apply(request) {
            Ok(Some(mut view)) => {
                // 每轮只会在结束的那次操作中上报一次
                if let Some(report) = view.just_resolved.take() {
                    server.stats.report(report);
                }
                GameResponse::Round { round: view }
            }
            Ok(None) => GameResponse::Closed,
            Err(cause) => GameResponse::GameError { cause },
        }
    }

    fn apply(&mut self, request: GameRequest) -> Result<Option<RoundView>> {
        let resolved_before = self
            .round
            .as_ref()
            .map_or(false, |round| round.stage().is_end());

        match request {
            GameRequest::NewRound {
                profile,
                custom,
                doors,
            } => {
                let (kind, hidden) = match profile {
                    Some(kind) => (kind, false),
                    None => (ProfileKind::random_builtin(&mut self.rng), true),
                };
                let profile = Profile::from_kind(kind, custom)?;
                let doors = doors.unwrap_or_default();
                self.round = Some(Round::new(profile, doors, &mut self.rng)?);
                self.hidden = hidden;
                info!(session = %self.id, profile = kind.name(), hidden, "new round");
            }
            GameRequest::Reset => {
                let round = self.round.as_mut().ok_or(Error::InvalidOperation)?;
                round.reset(&mut self.rng);
            }
            GameRequest::Pick { door } => {
                let round = self.round.as_mut().ok_or(Error::InvalidOperation)?;
                round.pick(door, &mut self.rng)?;
            }
            GameRequest::Decide { decision } => {
                let decision = decision.unwrap_or_else(|| self.rng.gen());
                let round = self.round.as_mut().ok_or(Error::InvalidOperation)?;
                round.decide(decision)?;
            }
            GameRequest::SecondPick { door } => {
                let round = self.round.as_mut().ok_or(Error::InvalidOperation)?;
                round.second_pick(door)?;
            }
            GameRequest::Leave => {
                self.round = None;
                return Ok(None);
            }
        }

        Ok(self
            .round
            .as_ref()
            .map(|round| RoundView::of(round, self.hidden, resolved_before)))
    }
}

async fn handle_ws(mut socket: WebSocket, server: Server) -> anyhow::Result<()> {
    let mut session = Session::new();
    info!(session = %session.id, "connection opened");

    while let Some(message) = socket.recv().await.transpose()? {
        match message {
            Message::Text(request) => {
                let response = match serde_json::from_str::<GameRequest>(&request) {
                    Ok(request) => session.handle(request, &server),
                    Err(e) => GameResponse::ServerError {
                        cause: ServerError::BadRequest {
                            reason: e.to_string(),
                        },
                    },
                };
                socket
                    .send(Message::Text(serde_json::to_string(&response)?))
                    .await?;
            }
            Message::Close(c) => {
                match c {
                    Some(c) => info!(
                        session = %session.id,
                        code = c.code,
                        reason = %c.reason,
                        "connection closed"
                    ),
                    None => info!(session = %session.id, "connection closed without close frame"),
                }
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action")]
enum GameRequest {
    /// 不指定主持人行为时随机选择一种内置行为并对挑战者隐藏
    NewRound {
        profile: Option<ProfileKind>,
        custom: Option<CustomConfig>,
        doors: Option<Doors>,
    },
    Reset,
    Pick {
        door: Door,
    },
    /// 不指定抉择时随机决定
    Decide {
        decision: Option<Decision>,
    },
    SecondPick {
        door: Door,
    },
    Leave,
}

/// 发送给挑战者的本轮状态，结束前不包含奖品位置
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundView {
    profile: Option<ProfileKind>,
    stage: Stage,
    doors: Vec<(Door, DoorStatus)>,
    player_pick: Option<Door>,
    host_opens: Option<Door>,
    switch_offered: bool,
    second_pick_candidates: Vec<Door>,
    final_pick: Option<Door>,
    outcome: Outcome,
    switched: bool,
    prize: Option<Door>,
    #[serde(skip)]
    just_resolved: Option<RoundReport>,
}

impl RoundView {
    fn of(round: &Round, hidden: bool, resolved_before: bool) -> Self {
        let resolved = round.stage().is_end();
        Self {
            profile: if hidden && !resolved {
                None
            } else {
                Some(round.profile().kind())
            },
            stage: round.stage(),
            doors: round.door_statuses(),
            player_pick: round.player_pick(),
            host_opens: round.host_opens(),
            switch_offered: round.switch_offered(),
            second_pick_candidates: round.second_pick_candidates(),
            final_pick: round.final_pick(),
            outcome: round.outcome(),
            switched: round.switched(),
            prize: resolved.then(|| round.prize()),
            just_resolved: if resolved && !resolved_before {
                round.report()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "resp")]
enum GameResponse {
    Round { round: RoundView },
    Closed,
    GameError { cause: Error },
    ServerError { cause: ServerError },
}
