mod handlers;
mod hub;

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;

use common::config::AppConfig;
use common::secrets::SecretBox;
use sandbox::Executor;

use crate::hub::Hub;

#[derive(Parser, Clone)]
#[command(name = "llm-playground", about = "LLM playground API")]
pub struct Args {
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:playground.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret_key: Option<String>,

    #[arg(long, env = "PLAYGROUND_CONFIG", default_value = "playground.toml")]
    pub config: String,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let port = args.port;

    let secrets = SecretBox::from_env_values(
        args.encryption_key.as_deref(),
        args.jwt_secret_key.as_deref(),
    )?;
    let config = AppConfig::load(&args.config)?;
    let pool = db::init_pool(&args.database_url).await?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;
    let executor = Executor::from_config(&config, &client);

    log::info!("LLM playground listening on http://localhost:{}", port);
    log::info!("Dashboard at http://localhost:{}/_dashboard", port);
    log::info!("code execution via {}", executor);

    let pool_data = web::Data::new(pool);
    let client_data = web::Data::new(client);
    let config_data = web::Data::new(config);
    let secrets_data = web::Data::new(secrets);
    let executor_data = web::Data::new(executor);
    let hub_data = web::Data::new(Hub::new());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024))
            .app_data(pool_data.clone())
            .app_data(client_data.clone())
            .app_data(config_data.clone())
            .app_data(secrets_data.clone())
            .app_data(executor_data.clone())
            .app_data(hub_data.clone())
            .configure(handlers::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
