//! Process configuration loaded once at startup.
//!
//! All values come from the environment with defaults suitable for local
//! development. The resulting `Config` is immutable and passed explicitly to
//! the server and store constructors; nothing reads the environment after
//! startup.

use std::env;

/// Development fallback for the signing secret. Startup logs a warning when
/// this is in use.
pub const DEV_SECRET: &str = "not-so-secret";

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub http_port: u16,
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Symmetric secret used for both token issuance and validation.
    /// Never rotated during a process lifetime.
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        let http_port = env::var("TASKBOARD_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);
        let db_path = env::var("TASKBOARD_DB_PATH").unwrap_or_else(|_| "taskboard.db".to_string());
        let jwt_secret = env::var("TASKBOARD_JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.to_string());
        Self { http_port, db_path, jwt_secret }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    pub fn is_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}
