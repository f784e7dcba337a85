use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use pinboard_gateway::connection;

use crate::state::AppState;

/// GET /gateway: the notification stream. Authentication happens inside the socket.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, hub, jwt_secret))
}
