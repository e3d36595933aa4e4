//! Router assembly: everything versioned under /api/v1.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::ApiContext;

pub fn build_router(ctx: ApiContext) -> Router {
    let auth = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password));

    let lost_items = Router::new()
        .route("/", post(handlers::items::create_lost).get(handlers::items::list_lost))
        .route(
            "/:id",
            get(handlers::items::get_lost).put(handlers::items::update_lost),
        )
        .route("/:id/matches", get(handlers::items::lost_matches));

    let found_items = Router::new()
        .route("/", post(handlers::items::create_found).get(handlers::items::list_found))
        .route("/:id", get(handlers::items::get_found))
        .route("/:id/matches", get(handlers::items::found_matches));

    let claims = Router::new()
        .route("/", post(handlers::claims::create))
        .route("/:id", get(handlers::claims::get))
        .route("/:id/questions", get(handlers::claims::questions))
        .route("/:id/verify", post(handlers::claims::verify))
        .route("/:id/cancel", post(handlers::claims::cancel))
        .route("/:id/dispute", post(handlers::claims::dispute))
        .route("/:id/handover/otp", post(handlers::handover::mint))
        .route("/:id/handover/verify", post(handlers::handover::redeem))
        .route("/:id/handover", get(handlers::handover::status));

    let admin = Router::new()
        .route(
            "/disputes/:id/resolve",
            post(handlers::admin::resolve_dispute),
        )
        .route("/users/:id/ban", post(handlers::admin::ban_user))
        .route("/users/:id/unban", post(handlers::admin::unban_user))
        .route(
            "/users/:id/confirm-email",
            post(handlers::admin::confirm_email),
        )
        .route(
            "/users/:id/confirm-phone",
            post(handlers::admin::confirm_phone),
        )
        .route(
            "/users/:id/trust/recompute",
            post(handlers::admin::recompute_trust),
        )
        .route("/scam-reports", get(handlers::admin::list_scam_reports))
        .route(
            "/scam-reports/:id/resolve",
            post(handlers::admin::resolve_scam_report),
        )
        .route("/audit", get(handlers::admin::recent_audit))
        .route("/audit/:entity/:id", get(handlers::admin::entity_audit));

    let v1 = Router::new()
        .nest("/auth", auth)
        .nest("/lost-items", lost_items)
        .nest("/found-items", found_items)
        .nest("/claims", claims)
        .nest("/admin", admin);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
