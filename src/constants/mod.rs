/// Allowed values for a conversation's auto-delete window, in days.
/// `None` (no retention) is always allowed and means messages are kept forever.
pub const AUTO_DELETE_DAYS: [i32; 5] = [3, 7, 14, 30, 90];

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub directory_url: String,
    pub directory_timeout_ms: u64,
    pub upload_dir: String,
    pub upload_base_url: String,
    pub sweep_interval_secs: u64,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let directory_url = std::env::var("DIRECTORY_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8091".to_string());
        let directory_timeout_ms = std::env::var("DIRECTORY_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse::<u64>()
            .expect("DIRECTORY_TIMEOUT_MS must be a valid u64 integer");

        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let upload_base_url =
            std::env::var("UPLOAD_BASE_URL").unwrap_or_else(|_| "/uploads".to_string());

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64 integer");

        Env {
            jwt_secret,
            database_url,
            redis_url,
            frontend_url,
            ip,
            port,
            directory_url,
            directory_timeout_ms,
            upload_dir,
            upload_base_url,
            sweep_interval_secs,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
