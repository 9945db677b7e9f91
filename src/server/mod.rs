pub mod appstate;

use axum::Router;

use crate::routes;

use self::appstate::AppState;

#[must_use]
pub fn build_service(state: AppState) -> Router {
    routes::router(state)
}
