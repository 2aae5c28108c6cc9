pub mod jobs;

use axum::Router;
use axum::routing::get;
use sqlx::PgPool;

pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/jobs", get(jobs::list).post(jobs::create))
        .route(
            "/jobs/{id}",
            get(jobs::get)
                .put(jobs::update)
                .patch(jobs::update)
                .delete(jobs::delete),
        )
        .with_state(pool)
}
