use anyhow::Context;

/// Environment-derived settings, read once at startup and passed down
/// explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();

        let database_url =
            dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_owned());
        let port = match dotenv::var("PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            Err(_) => 3000,
        };

        Ok(Config { database_url, port })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
