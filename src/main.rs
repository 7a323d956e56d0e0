/// API сервер для модели цены устройства

use anyhow::Context;

use device_price_ml::{
    config::ServeConfig,
    logging,
    server::{self, AppState},
    PricePredictor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    logging::init();

    let config = ServeConfig::from_env();

    // Модель загружается один раз и дальше только читается
    let predictor = PricePredictor::load(&config.model_path)
        .with_context(|| format!("loading model from {}", config.model_path.display()))?;

    let app = server::router(AppState::new(predictor));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
