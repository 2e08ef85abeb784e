use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub gateway_api_url: String,
    pub gateway_api_key: String,
    pub gateway_webhook_secret: String,
    pub settlement_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            gateway_api_url: env::var("GATEWAY_API_URL")?,
            gateway_api_key: env::var("GATEWAY_API_KEY")?,
            gateway_webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET")?,
            settlement_interval_secs: env::var("SETTLEMENT_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
        })
    }
}
