use actix_web::{web, HttpResponse};
use common::GUEST_USER_ID;
use sqlx::SqlitePool;

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(body)
}

fn db_failure(e: anyhow::Error) -> HttpResponse {
    log::error!("dashboard query failed: {:#}", e);
    HttpResponse::InternalServerError().body(format!("DB error: {}", e))
}

pub async fn dashboard_home(pool: web::Data<SqlitePool>) -> HttpResponse {
    let pool = pool.get_ref();
    let overview = pages::home::Overview {
        model_count: db::count_models(pool).await.unwrap_or(0),
        chat_count: db::count_chats(pool).await.unwrap_or(0),
        active_collab_count: db::count_active_collab_sessions(pool).await.unwrap_or(0),
        active_providers: db::active_providers(pool, GUEST_USER_ID)
            .await
            .unwrap_or_default(),
    };
    html(pages::home::render_home(&overview))
}

pub async fn dashboard_models(pool: web::Data<SqlitePool>) -> HttpResponse {
    match db::list_all_models(pool.get_ref()).await {
        Ok(models) => html(pages::models::render_models(&models)),
        Err(e) => db_failure(e),
    }
}

pub async fn dashboard_chats(pool: web::Data<SqlitePool>) -> HttpResponse {
    match db::list_chats(pool.get_ref(), GUEST_USER_ID, 50).await {
        Ok(chats) => html(pages::chats::render_chats(&chats)),
        Err(e) => db_failure(e),
    }
}

pub async fn dashboard_chat(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> HttpResponse {
    match db::get_chat(pool.get_ref(), GUEST_USER_ID, &path).await {
        Ok(Some(chat)) => html(pages::chats::render_chat(&chat)),
        Ok(None) => HttpResponse::NotFound().body("Chat history not found"),
        Err(e) => db_failure(e),
    }
}

pub async fn dashboard_collaboration(pool: web::Data<SqlitePool>) -> HttpResponse {
    match db::list_active_collab_sessions(pool.get_ref(), 50).await {
        Ok(sessions) => html(pages::collaboration::render_collaboration(&sessions)),
        Err(e) => db_failure(e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use common::catalog::Provider;
    use common::GUEST_USER_ID;
    use serde_json::json;

    use crate::handlers::test_support::TestState;

    #[actix_web::test]
    async fn pages_render_stored_data() {
        let state = TestState::new().await;
        state.add_key(Provider::OpenAi, "sk-0123456789abcdefghijkl").await;
        db::upsert_chat(
            &state.pool,
            &db::NewChat {
                user_id: GUEST_USER_ID,
                session_id: "chat-1",
                model_id: None,
                model_name: "GPT-4o",
                messages: &[json!({"role": "user", "content": "what is a borrow?"})],
                title: Some("Borrowing"),
            },
        )
        .await
        .unwrap();
        db::create_collab_session(&state.pool, GUEST_USER_ID, "review", None)
            .await
            .unwrap();
        let app = test::init_service(state.app()).await;

        for (uri, needle) in [
            ("/_dashboard", "LLM Playground - Overview"),
            ("/_dashboard", "configured"),
            ("/_dashboard/models", "gpt-4o-mini"),
            ("/_dashboard/chats", "Borrowing"),
            ("/_dashboard/chats", "/_dashboard/chats/chat-1"),
            ("/_dashboard/chats/chat-1", "what is a borrow?"),
            ("/_dashboard/collaboration", "review"),
        ] {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
            assert_eq!(
                resp.headers().get("content-type").unwrap(),
                "text/html",
                "{}",
                uri
            );
            let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
            assert!(body.contains(needle), "{} missing {:?}", uri, needle);
        }
    }

    #[actix_web::test]
    async fn missing_chat_page_is_404() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let req = test::TestRequest::get()
            .uri("/_dashboard/chats/nope")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
