use std::sync::Arc;

use tracing::info;

use mailrelay::{Config, SmtpMailer, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration with environment overrides.");
            dotenvy::dotenv().ok();
            let mut config = Config::default();
            if let Err(e) = config.apply_env_overrides() {
                eprintln!("Invalid environment configuration: {e}");
                std::process::exit(1);
            }
            config
        }
    };

    // Initialize logging
    if let Err(e) = mailrelay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        mailrelay::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    info!("mailrelay - contact form mail relay");
    if config.oauth.is_configured() {
        info!("Delivering via OAuth2 ({})", config.oauth.service);
    } else {
        info!(
            "Delivering via SMTP {}:{}",
            config.smtp.host, config.smtp.port
        );
    }

    let server = match WebServer::new(&config, Arc::new(SmtpMailer::new())) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
