/// Secret-bearing sections do not derive `Debug` so the config can never be
/// dumped into a log line.
#[derive(Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub ecpay: Ecpay,
    pub reconciliation: Reconciliation,
    pub notifications: Notifications,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Clone)]
pub struct Database {
    pub url: String,
    pub max_pool_size: u32,
    pub connection_timeout_secs: u64,
    pub statement_timeout_ms: u64,
}

#[derive(Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ecpay {
    pub checkout_url: String,
    pub return_url: String,
    pub client_back_url: String,
    pub choose_payment: String,
}

#[derive(Clone)]
pub struct Reconciliation {
    /// `None` disables the cron endpoint entirely.
    pub cron_secret: Option<String>,
}

#[derive(Clone)]
pub struct Notifications {
    pub line_channel_access_token: Option<String>,
    pub max_attempts: i32,
    pub poll_interval_secs: u64,
    pub send_timeout_secs: u64,
}
