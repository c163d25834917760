// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::services::DispatchService;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 60;

// Configuração lida uma vez do ambiente (.env é opcional)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    // Sessões sem uso por mais tempo que isso são descartadas
    pub session_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {raw}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        let session_idle_minutes: u64 = match env::var("SESSION_IDLE_MINUTES") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("SESSION_IDLE_MINUTES inválido: {raw}"))?,
            Err(_) => DEFAULT_SESSION_IDLE_MINUTES,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            session_idle_timeout: Duration::from_secs(session_idle_minutes * 60),
        })
    }

    /// Conecta ao banco, usando '?' para propagar erros
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let db_pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(db_pool)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub dispatch_service: DispatchService,
}

impl AppState {
    // --- Monta o gráfico de dependências ---
    pub fn new(jwt_secret: String, dispatch_service: DispatchService) -> Self {
        Self {
            jwt_secret,
            dispatch_service,
        }
    }
}
