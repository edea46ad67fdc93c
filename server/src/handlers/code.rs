use actix_web::error::{ErrorBadRequest, ErrorInternalServerError, ErrorNotFound};
use actix_web::{web, HttpResponse};
use common::catalog::Provider;
use common::config::AppConfig;
use common::secrets::SecretBox;
use common::GUEST_USER_ID;
use proxy::{GenerateParams, ProviderClient};
use sandbox::testgen::{self, Difficulty};
use sandbox::{analyze, integrity, optimize, profile, Executor};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use super::db_error;

fn default_language() -> String {
    "python".to_string()
}

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: String,
    /// Code session to store results on, when given.
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TestGenRequest {
    pub code: String,
    pub difficulty: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RunTestsRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub test_code: String,
}

#[derive(Deserialize)]
pub struct OptimizeRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Deserialize)]
pub struct NewCodeSession {
    pub name: String,
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Persist results on a code session. A missing session is a 404.
async fn store_results(
    pool: &SqlitePool,
    session_id: Option<&str>,
    test_code: Option<&str>,
    analysis: Option<&Value>,
) -> Result<(), actix_web::Error> {
    let Some(id) = session_id else {
        return Ok(());
    };
    let analysis_json = analysis.map(|a| a.to_string());
    let updated = db::update_code_session_results(pool, id, test_code, analysis_json.as_deref())
        .await
        .map_err(db_error)?;
    if !updated {
        return Err(ErrorNotFound("Code session not found"));
    }
    Ok(())
}

fn combine(code: &str, test_code: &str) -> String {
    format!("{}\n\n{}", code, test_code)
}

pub async fn execute_code(
    executor: web::Data<Executor>,
    body: web::Json<CodeRequest>,
) -> HttpResponse {
    let result = executor.execute(&body.code).await;
    HttpResponse::Ok().json(result)
}

pub async fn analyze_code(
    pool: web::Data<SqlitePool>,
    body: web::Json<CodeRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let analysis = analyze(&body.code);
    let integrity = integrity::check(&body.code);
    let profile = profile::profile(&body.code);
    let response = json!({
        "complexity_score": analysis.complexity,
        "lines_of_code": analysis.lines_of_code,
        "functions": analysis.functions,
        "classes": analysis.classes,
        "imports": analysis.imports,
        "issues": analysis.issues,
        "suggestions": analysis.suggestions,
        "syntax_error": analysis.syntax_error,
        "integrity": integrity,
        "performance_score": profile.performance_score,
    });
    store_results(pool.get_ref(), body.session_id.as_deref(), None, Some(&response)).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn generate_tests(
    pool: web::Data<SqlitePool>,
    body: web::Json<TestGenRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let difficulty = Difficulty::parse(body.difficulty.as_deref().unwrap_or("mid"));
    let analysis = analyze(&body.code);
    let test_code = testgen::generate_tests(&body.code, &analysis, difficulty.num_tests());
    let test_count = testgen::count_tests(&test_code);
    store_results(pool.get_ref(), body.session_id.as_deref(), Some(&test_code), None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "test_code": test_code,
        "test_count": test_count,
        "coverage_estimate": testgen::coverage_estimate(test_count),
    })))
}

pub async fn profile_code(body: web::Json<CodeRequest>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "profile_data": profile::profile(&body.code),
        "success": true,
    }))
}

pub async fn run_tests(
    executor: web::Data<Executor>,
    body: web::Json<RunTestsRequest>,
) -> HttpResponse {
    let results = executor.run_tests(&combine(&body.code, &body.test_code)).await;
    HttpResponse::Ok().json(json!({
        "test_results": results,
        "success": true,
        "output": "Tests executed",
    }))
}

pub async fn run_auto_tests(
    executor: web::Data<Executor>,
    body: web::Json<TestGenRequest>,
) -> HttpResponse {
    let difficulty = Difficulty::parse(body.difficulty.as_deref().unwrap_or("mid"));
    let analysis = analyze(&body.code);
    let test_code = testgen::generate_tests(&body.code, &analysis, difficulty.num_tests());
    let results = executor.run_tests(&combine(&body.code, &test_code)).await;
    let passed = results.iter().filter(|r| r.passed).count();
    HttpResponse::Ok().json(json!({
        "test_count": testgen::count_tests(&test_code),
        "test_code": test_code,
        "passed": passed,
        "failed": results.len() - passed,
        "test_results": results,
        "success": true,
    }))
}

pub async fn optimize_code(body: web::Json<OptimizeRequest>) -> HttpResponse {
    let improvements = optimize::suggest(&analyze(&body.code));
    HttpResponse::Ok().json(json!({
        "original_code": body.code,
        "optimized_code": body.code,
        "improvements": improvements,
        "performance_gain": null,
    }))
}

/// Ask the first configured provider for a rewritten version of the code.
pub async fn generate_optimized(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
    body: web::Json<OptimizeRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let key = db::first_active_key(pool.get_ref(), GUEST_USER_ID)
        .await
        .map_err(db_error)?
        .ok_or_else(|| ErrorBadRequest("Please configure an API key first"))?;
    let provider = Provider::parse(&key.provider).ok_or_else(|| {
        ErrorInternalServerError(format!("Unsupported provider: {}", key.provider))
    })?;
    let api_key = secrets.open(&key.encrypted_key).map_err(|e| {
        ErrorInternalServerError(format!("Error generating optimized code: {}", e))
    })?;

    let prompt = proxy::render_template(
        &config.optimize_prompt,
        &json!({ "language": body.language, "code": body.code }),
    );
    let params = GenerateParams {
        prompt,
        model: provider.default_model().to_string(),
        temperature: 0.3,
        max_tokens: 2000,
    };
    let outcome = ProviderClient::new(provider, api_key, &config, &client)
        .generate(&params)
        .await;
    if let Err(e) = db::touch_api_key(pool.get_ref(), &key.id.to_string()).await {
        log::warn!("failed to record key usage: {}", e);
    }

    if !outcome.success {
        let error = outcome
            .error
            .unwrap_or_else(|| "Failed to generate optimized code".to_string());
        return Err(ErrorInternalServerError(format!(
            "Error generating optimized code: {}",
            error
        )));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "original_code": body.code,
        "optimized_code": outcome.response.unwrap_or_default(),
        "provider": key.provider,
    })))
}

pub async fn create_code_session(
    pool: web::Data<SqlitePool>,
    body: web::Json<NewCodeSession>,
) -> Result<HttpResponse, actix_web::Error> {
    let session = db::create_code_session(
        pool.get_ref(),
        GUEST_USER_ID,
        &body.name,
        &body.code,
        &body.language,
    )
    .await
    .map_err(db_error)?;
    Ok(HttpResponse::Ok().json(session.to_response()))
}

pub async fn list_code_sessions(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, actix_web::Error> {
    let sessions = db::list_code_sessions(pool.get_ref(), GUEST_USER_ID, 10)
        .await
        .map_err(db_error)?;
    let body: Vec<Value> = sessions.iter().map(|s| s.to_response()).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use common::catalog::Provider;
    use common::config::AppConfig;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::handlers::test_support::TestState;

    const SAMPLE: &str = "def add(a, b):\n    return a + b\n";

    #[actix_web::test]
    async fn analyze_reports_structure_and_integrity() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let code = "import os\n\ndef run(cmd):\n    return eval(cmd)\n";
        let req = test::TestRequest::post()
            .uri("/code/analyze")
            .set_json(json!({ "code": code }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["functions"][0]["name"], "run");
        assert_eq!(resp["imports"][0], "os");
        assert_eq!(resp["complexity_score"], 1);
        assert_eq!(resp["integrity"]["security_issues"][0]["type"], "dangerous_function");
        assert!(resp["syntax_error"].is_null());
    }

    #[actix_web::test]
    async fn generated_tests_follow_difficulty() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let req = test::TestRequest::post()
            .uri("/code/generate-tests")
            .set_json(json!({ "code": SAMPLE, "difficulty": "low" }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        let count = resp["test_count"].as_u64().unwrap();
        assert!(count >= 1 && count <= 5);
        assert_eq!(resp["coverage_estimate"].as_u64().unwrap(), (count * 10).min(95));
        assert!(resp["test_code"].as_str().unwrap().contains("import unittest"));
    }

    #[actix_web::test]
    async fn results_are_stored_on_code_session() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/code/sessions")
            .set_json(json!({ "name": "adder", "code": SAMPLE }))
            .to_request();
        let session: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session["language"], "python");
        let id = session["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/code/analyze")
            .set_json(json!({ "code": SAMPLE, "session_id": id }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let list: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/code/sessions").to_request(),
        )
        .await;
        assert_eq!(list[0]["name"], "adder");
        assert_eq!(list[0]["analysis_results"]["functions"][0]["name"], "add");

        let req = test::TestRequest::post()
            .uri("/code/generate-tests")
            .set_json(json!({ "code": SAMPLE, "session_id": "missing" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn profile_wraps_report() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let code = "for i in a:\n    for j in b:\n        print(i, j)\n";
        let req = test::TestRequest::post()
            .uri("/code/profile")
            .set_json(json!({ "code": code }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["success"], true);
        assert_eq!(resp["profile_data"]["hotspots"][0]["type"], "nested_loop");
        assert_eq!(resp["profile_data"]["performance_score"], 90);
    }

    #[actix_web::test]
    async fn optimize_lists_improvements() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let req = test::TestRequest::post()
            .uri("/code/optimize")
            .set_json(json!({ "code": SAMPLE }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["optimized_code"], SAMPLE);
        assert!(resp["performance_gain"].is_null());
        assert_eq!(resp["improvements"][0]["type"], "code_quality");
        assert_eq!(resp["improvements"][0]["message"], "Missing docstring for add");
    }

    #[actix_web::test]
    async fn remote_sandbox_runs_tests() {
        let sandbox = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_string_contains("class TestFunctions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "output": "",
                "error": "...\n----\nRan 3 tests in 0.001s\n\nOK\n",
                "return_code": 0
            })))
            .mount(&sandbox)
            .await;
        let state = TestState::with_config(AppConfig {
            sandbox_url: Some(sandbox.uri()),
            ..AppConfig::default()
        })
        .await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/code/run-auto-tests")
            .set_json(json!({ "code": SAMPLE, "difficulty": "low" }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["passed"], 3);
        assert_eq!(resp["failed"], 0);
        assert_eq!(resp["success"], true);
    }

    #[actix_web::test]
    async fn execute_via_remote_sandbox_on_both_routes() {
        let sandbox = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({ "code": "print(2)" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "output": "2\n", "error": "", "return_code": 0
            })))
            .mount(&sandbox)
            .await;
        let state = TestState::with_config(AppConfig {
            sandbox_url: Some(sandbox.uri()),
            ..AppConfig::default()
        })
        .await;
        let app = test::init_service(state.app()).await;

        for uri in ["/code/execute", "/execute"] {
            let req = test::TestRequest::post()
                .uri(uri)
                .set_json(json!({ "code": "print(2)" }))
                .to_request();
            let resp: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp["success"], true);
            assert_eq!(resp["output"], "2\n");
            assert_eq!(resp["memory_usage"], 0.0);
        }
    }

    #[actix_web::test]
    async fn generate_optimized_needs_a_key() {
        let state = TestState::new().await;
        let app = test::init_service(state.app()).await;
        let req = test::TestRequest::post()
            .uri("/code/generate-optimized")
            .set_json(json!({ "code": SAMPLE, "language": "python" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(resp).await, "Please configure an API key first");
    }

    #[actix_web::test]
    async fn generate_optimized_uses_first_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({
                "model": "claude-3-5-sonnet-20241022",
                "max_tokens": 2000,
                "temperature": 0.3
            })))
            .and(body_string_contains("optimize the following python code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "```python\nadd = lambda a, b: a + b\n```"}]
            })))
            .mount(&server)
            .await;
        let state = TestState::with_mock_providers(&server.uri()).await;
        state.add_key(Provider::Anthropic, "sk-ant-REDACTED").await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/code/generate-optimized")
            .set_json(json!({ "code": SAMPLE, "language": "python" }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["success"], true);
        assert_eq!(resp["provider"], "anthropic");
        assert!(resp["optimized_code"].as_str().unwrap().contains("lambda"));
    }

    #[actix_web::test]
    async fn generate_optimized_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;
        let state = TestState::with_mock_providers(&server.uri()).await;
        state.add_key(Provider::Anthropic, "sk-ant-REDACTED").await;
        let app = test::init_service(state.app()).await;

        let req = test::TestRequest::post()
            .uri("/code/generate-optimized")
            .set_json(json!({ "code": SAMPLE }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            test::read_body(resp).await,
            "Error generating optimized code: rate limited"
        );
    }
}
