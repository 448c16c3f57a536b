use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use transcription_gateway::config_validator::GatewayConfigValidator;
use transcription_gateway::{
    config_loader, configure, model, HandlerConfig, ServerConfig, WhisperConfig,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Values from the config file only fill variables the environment leaves unset
    config_loader::load_config();

    if std::env::args().any(|arg| arg == "--sample-config") {
        print!("{}", GatewayConfigValidator::generate_sample_config());
        return Ok(());
    }

    let validation = GatewayConfigValidator::validate_env();
    if !validation.is_valid() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "invalid configuration ({} error(s))",
                validation.errors.len()
            ),
        ));
    }

    let server_config = ServerConfig::default();
    let handler_config = HandlerConfig::default();
    let whisper_config = WhisperConfig::default();

    if let Err(e) = handler_config.ensure_temp_dir() {
        warn!(
            "Failed to create temp directory {}: {}",
            handler_config.temp_dir.display(),
            e
        );
    }

    // The model is loaded once, before the listener accepts connections
    info!("Speech backend: {}", whisper_config.backend);
    let model = match model::load(whisper_config) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to load speech model: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()));
        }
    };
    let model = web::Data::from(model);

    info!(
        "Starting Transcription Gateway on http://{}",
        server_config.bind_address()
    );
    info!("Using temp directory: {}", handler_config.temp_dir.display());
    info!("Whisper model: {}", model.model_name());

    let handler_data = web::Data::new(handler_config);
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(model.clone())
            .app_data(handler_data.clone())
            .configure(configure)
    })
    .client_disconnect_timeout(Duration::from_secs(server_config.timeout))
    .keep_alive(Duration::from_secs(server_config.keepalive));

    if server_config.workers > 0 {
        server = server.workers(server_config.workers);
    }

    server.bind(server_config.bind_address())?.run().await
}
