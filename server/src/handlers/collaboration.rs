use actix_web::error::ErrorNotFound;
use actix_web::{web, HttpResponse};
use common::GUEST_USER_ID;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use super::db_error;

#[derive(Deserialize)]
pub struct NewCollaboration {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub user: String,
}

#[derive(Deserialize)]
pub struct ShareRequest {
    pub model_id: String,
}

fn not_found() -> actix_web::Error {
    ErrorNotFound("Collaboration session not found")
}

pub async fn create_collaboration(
    pool: web::Data<SqlitePool>,
    body: web::Json<NewCollaboration>,
) -> Result<HttpResponse, actix_web::Error> {
    let session = db::create_collab_session(
        pool.get_ref(),
        GUEST_USER_ID,
        &body.name,
        body.description.as_deref(),
    )
    .await
    .map_err(db_error)?;
    log::info!("collaboration session {} created", session.session_id);
    Ok(HttpResponse::Ok().json(session.to_response()))
}

pub async fn list_collaborations(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, actix_web::Error> {
    let sessions = db::list_active_collab_sessions(pool.get_ref(), 10)
        .await
        .map_err(db_error)?;
    let body: Vec<Value> = sessions.iter().map(|s| s.to_response()).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn join_collaboration(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<JoinRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let session = db::add_participant(pool.get_ref(), &path, &body.user)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(session.to_response()))
}

pub async fn share_collaboration_model(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<ShareRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let session = db::share_model(pool.get_ref(), &path, &body.model_id)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(session.to_response()))
}

pub async fn close_collaboration(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    if !db::deactivate_collab_session(pool.get_ref(), &path)
        .await
        .map_err(db_error)?
    {
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Collaboration session closed"})))
}
