mod chat_history;
mod code;
mod collaboration;
mod dashboard;
mod llm;
mod models;
mod root;
mod ws;

use actix_web::web;

pub use chat_history::*;
pub use code::*;
pub use collaboration::*;
pub use dashboard::*;
pub use llm::*;
pub use models::*;
pub use root::*;
pub use ws::*;

/// Map a storage failure to a plain-text 500.
pub(crate) fn db_error(e: anyhow::Error) -> actix_web::Error {
    log::error!("database error: {:#}", e);
    actix_web::error::ErrorInternalServerError(format!("DB error: {}", e))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/execute", web::post().to(execute_code))
        .route("/ws/{session_id}", web::get().to(collaboration_ws))
        .service(
            web::scope("/llm")
                .route("/api-keys", web::post().to(add_api_key))
                .route("/api-keys", web::get().to(list_api_keys))
                .route("/api-keys/{provider}", web::delete().to(delete_api_key))
                .route("/available-models", web::get().to(available_models))
                .route("/check-model-health", web::post().to(check_model_health))
                .route("/generate", web::post().to(generate))
                .route("/generate/stream", web::post().to(generate_stream)),
        )
        .route("/models", web::get().to(list_models))
        .service(
            web::scope("/models")
                .route("/upload", web::post().to(upload_model))
                .route("/list", web::get().to(list_models))
                .route("/health-check", web::post().to(check_all_models))
                .route("/{id}", web::delete().to(delete_model)),
        )
        .service(
            web::scope("/code")
                .route("/execute", web::post().to(execute_code))
                .route("/analyze", web::post().to(analyze_code))
                .route("/generate-tests", web::post().to(generate_tests))
                .route("/profile", web::post().to(profile_code))
                .route("/run-tests", web::post().to(run_tests))
                .route("/run-auto-tests", web::post().to(run_auto_tests))
                .route("/optimize", web::post().to(optimize_code))
                .route("/generate-optimized", web::post().to(generate_optimized))
                .route("/sessions", web::post().to(create_code_session))
                .route("/sessions", web::get().to(list_code_sessions)),
        )
        .service(
            web::scope("/collaboration")
                .route("/create", web::post().to(create_collaboration))
                .route("/sessions", web::get().to(list_collaborations))
                .route("/sessions/{session_id}/join", web::post().to(join_collaboration))
                .route("/sessions/{session_id}/models", web::post().to(share_collaboration_model))
                .route("/sessions/{session_id}", web::delete().to(close_collaboration))
                .route("/ws/{session_id}", web::get().to(collaboration_ws)),
        )
        .service(
            web::scope("/api")
                .route("/chat-history", web::post().to(save_chat))
                .route("/chat-history", web::get().to(list_chats))
                .route("/chat-history/{session_id}", web::get().to(get_chat))
                .route("/chat-history/{session_id}", web::put().to(replace_chat))
                .route("/chat-history/{session_id}/messages", web::post().to(append_chat))
                .route("/chat-history/{session_id}", web::delete().to(delete_chat)),
        )
        .route("/_dashboard", web::get().to(dashboard_home))
        .route("/_dashboard/models", web::get().to(dashboard_models))
        .route("/_dashboard/chats", web::get().to(dashboard_chats))
        .route("/_dashboard/chats/{session_id}", web::get().to(dashboard_chat))
        .route("/_dashboard/collaboration", web::get().to(dashboard_collaboration));
}
