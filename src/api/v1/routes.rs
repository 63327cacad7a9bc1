/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - v1 配下はすべて Bearer 必須 (gate を route_layer で適用)
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::me::me;
use crate::middleware::auth::gate;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new().route("/me", get(me));

    gate::apply(protected, state)
}
