use actix_web::error::ErrorNotFound;
use actix_web::{web, HttpResponse};
use common::GUEST_USER_ID;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use super::db_error;

const LIST_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct SaveChatRequest {
    pub session_id: String,
    pub model_id: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub messages: Vec<Value>,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplaceChatRequest {
    pub messages: Vec<Value>,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct AppendChatRequest {
    pub messages: Vec<Value>,
}

fn not_found() -> actix_web::Error {
    ErrorNotFound("Chat history not found")
}

pub async fn save_chat(
    pool: web::Data<SqlitePool>,
    body: web::Json<SaveChatRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let chat = db::upsert_chat(
        pool.get_ref(),
        &db::NewChat {
            user_id: GUEST_USER_ID,
            session_id: &body.session_id,
            model_id: body.model_id.as_deref(),
            model_name: &body.model_name,
            messages: &body.messages,
            title: body.title.as_deref(),
        },
    )
    .await
    .map_err(db_error)?;
    Ok(HttpResponse::Ok().json(chat.to_response()))
}

pub async fn list_chats(pool: web::Data<SqlitePool>) -> Result<HttpResponse, actix_web::Error> {
    let chats = db::list_chats(pool.get_ref(), GUEST_USER_ID, LIST_LIMIT)
        .await
        .map_err(db_error)?;
    let body: Vec<Value> = chats.iter().map(|c| c.to_response()).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn get_chat(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let chat = db::get_chat(pool.get_ref(), GUEST_USER_ID, &path)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(chat.to_response()))
}

pub async fn replace_chat(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<ReplaceChatRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let chat = db::replace_chat_messages(
        pool.get_ref(),
        GUEST_USER_ID,
        &path,
        &body.messages,
        body.title.as_deref(),
    )
    .await
    .map_err(db_error)?
    .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(chat.to_response()))
}

pub async fn append_chat(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<AppendChatRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let chat = db::append_chat_messages(pool.get_ref(), GUEST_USER_ID, &path, &body.messages)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(chat.to_response()))
}

pub async fn delete_chat(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    if !db::delete_chat(pool.get_ref(), GUEST_USER_ID, &path)
        .await
        .map_err(db_error)?
    {
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Chat history deleted"})))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::handlers::test_support::TestState;

    #[actix_web::test]
    async fn save_is_an_upsert() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;

        for content in ["first", "second"] {
            let req = test::TestRequest::post()
                .uri("/api/chat-history")
                .set_json(json!({
                    "session_id": "s-1",
                    "model_name": "GPT-4o",
                    "messages": [{"role": "user", "content": content}],
                }))
                .to_request();
            let chat: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(chat["title"], "Chat with GPT-4o");
            assert_eq!(chat["user_id"], "guest-user");
        }

        let list: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/chat-history").to_request(),
        )
        .await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["messages"][0]["content"], "second");
    }

    #[actix_web::test]
    async fn replace_append_and_delete() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/chat-history")
            .set_json(json!({
                "session_id": "s-2",
                "model_name": "Claude",
                "messages": [{"role": "user", "content": "hi"}],
                "title": "greeting",
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/chat-history/s-2/messages")
            .set_json(json!({ "messages": [{"role": "assistant", "content": "hello"}] }))
            .to_request();
        let chat: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chat["messages"].as_array().unwrap().len(), 2);
        assert_eq!(chat["messages"][1]["role"], "assistant");

        let req = test::TestRequest::put()
            .uri("/api/chat-history/s-2")
            .set_json(json!({ "messages": [], "title": "cleared" }))
            .to_request();
        let chat: Value = test::call_and_read_body_json(&app, req).await;
        assert!(chat["messages"].as_array().unwrap().is_empty());
        assert_eq!(chat["title"], "cleared");

        let req = test::TestRequest::get().uri("/api/chat-history/s-2").to_request();
        let chat: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chat["model_name"], "Claude");

        let req = test::TestRequest::delete().uri("/api/chat-history/s-2").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["message"], "Chat history deleted");

        let req = test::TestRequest::get().uri("/api/chat-history/s-2").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::read_body(resp).await, "Chat history not found");
    }

    #[actix_web::test]
    async fn missing_chat_is_404_everywhere() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/chat-history/ghost/messages")
            .set_json(json!({ "messages": [] }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/chat-history/ghost")
            .set_json(json!({ "messages": [] }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/api/chat-history/ghost").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
