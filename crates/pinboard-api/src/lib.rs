//! HTTP surface of the board service.

pub mod auth;
pub mod boards;
pub mod error;
pub mod extract;
pub mod files;
pub mod gateway;
pub mod media;
pub mod members;
pub mod middleware;
pub mod posts;
pub mod state;
pub mod things;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner, EngineSettings};

/// Every route of the service. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/media/{*key}", get(media::serve_media))
        .route("/gateway", get(gateway::ws_upgrade));

    let protected_routes = Router::new()
        .route("/boards", post(boards::create_board))
        .route(
            "/boards/{board_id}",
            get(boards::get_board)
                .post(boards::update_board)
                .delete(boards::delete_board),
        )
        .route("/boards/{board_id}/things", get(boards::get_board_things))
        .route(
            "/boards/{board_id}/cover",
            post(files::upload_cover).layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE)),
        )
        .route(
            "/boards/{board_id}/follow",
            post(members::follow).delete(members::unfollow),
        )
        .route("/boards/{board_id}/members", post(members::invite))
        .route(
            "/invitations",
            get(members::list_invitations).post(members::answer_invitation),
        )
        .route("/boards/{board_id}/members/role", post(members::change_role))
        .route("/boards/{board_id}/members/block", post(members::block))
        .route("/boards/{board_id}/members/unblock", post(members::unblock))
        .route("/boards/{board_id}/members/remove", post(members::remove))
        .route("/boards/{board_id}/posts", post(posts::create_post))
        .route(
            "/boards/{board_id}/posts/{post_id}/things",
            get(posts::get_post_things).post(posts::create_thing),
        )
        .route(
            "/boards/{board_id}/posts/{post_id}/files",
            post(files::upload_file).layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE)),
        )
        .route("/things/{thing_id}/likes", post(things::toggle_like))
        .route("/things/{thing_id}/bookmark", post(things::toggle_bookmark))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
