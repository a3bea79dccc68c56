pub mod auth;
pub mod error;
pub mod middleware;
pub mod patients;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::error::{method_not_allowed, route_not_found};
use crate::middleware::require_auth;
use crate::state::AppState;

/// All routes of the clinic API. `/register` and `/login` are public; the rest
/// require a bearer token. A wrong method answers 405 before any token check.
pub fn router(state: AppState) -> Router {
    let require_token = axum_middleware::from_fn_with_state(state.clone(), require_auth);

    let public_routes = Router::new()
        .route("/register", post(auth::register).fallback(method_not_allowed))
        .route("/login", post(auth::login).fallback(method_not_allowed));

    // Method-level route_layer wraps only the routed methods, not the fallback.
    let protected_routes = Router::new()
        .route(
            "/user",
            get(auth::current_user)
                .route_layer(require_token.clone())
                .fallback(method_not_allowed),
        )
        .route(
            "/patients",
            get(patients::list_patients)
                .post(patients::create_patient)
                .route_layer(require_token.clone())
                .fallback(method_not_allowed),
        )
        .route(
            "/patients/{id}",
            get(patients::get_patient)
                .put(patients::update_patient)
                .patch(patients::update_patient)
                .delete(patients::delete_patient)
                .route_layer(require_token)
                .fallback(method_not_allowed),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
        .with_state(state)
}
