use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::job::{Job, JobFilters, JobInput};

fn check_id(id: i32) -> Result<i32, AppError> {
    if id <= 0 {
        return Err(AppError::BadRequest("Invalid job ID".to_string()));
    }
    Ok(id)
}

pub async fn list(
    State(pool): State<PgPool>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<Vec<Job>>, AppError> {
    let jobs = Job::list(&pool, &filters).await?;
    Ok(Json(jobs))
}

pub async fn get(State(pool): State<PgPool>, Path(id): Path<i32>) -> Result<Json<Job>, AppError> {
    let job = Job::get(&pool, check_id(id)?).await?;
    Ok(Json(job))
}

pub async fn create(
    State(pool): State<PgPool>,
    Json(input): Json<JobInput>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let new_job = input.into_new_job(Utc::now())?;
    let job = Job::insert(&pool, &new_job).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn update(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    Json(input): Json<JobInput>,
) -> Result<Json<Job>, AppError> {
    let job = Job::update(&pool, check_id(id)?, input).await?;
    Ok(Json(job))
}

pub async fn delete(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    Job::delete(&pool, check_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
