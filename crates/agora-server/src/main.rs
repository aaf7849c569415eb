use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::middleware::require_auth;
use agora_api::{AppState, AppStateInner, chats, images};
use agora_chat::ChatService;
use agora_gateway::connection;
use agora_gateway::rooms::RoomRegistry;

#[derive(Clone)]
struct ServerState {
    chat: Arc<ChatService>,
    rooms: RoomRegistry,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("AGORA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let upload_dir = std::env::var("AGORA_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AGORA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(agora_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let chat = Arc::new(ChatService::with_store(db));
    let rooms = RoomRegistry::new();

    let app_state: AppState = Arc::new(AppStateInner {
        chat: chat.clone(),
        images: images::ImageStore::new(&upload_dir),
    });

    let state = ServerState {
        chat,
        rooms,
        jwt_secret,
    };

    // Routes
    let protected_routes = Router::new()
        .route("/ads/{ad_id}/chat", get(chats::get_chat))
        .route("/inbox", get(chats::get_inbox))
        .route("/chat/images", post(images::upload_chat_image))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(protected_routes)
        .merge(ws_route)
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.rooms, state.chat, state.jwt_secret)
    })
}
