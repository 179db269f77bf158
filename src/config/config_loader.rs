use anyhow::{Context, Result};
use std::str::FromStr;

use super::config_model::{
    Auth, Database, DotEnvyConfig, Ecpay, Notifications, Reconciliation, Server,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub(crate) fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let server = Server {
        port: env.parsed("SERVER_PORT")?,
        body_limit: env.parsed("SERVER_BODY_LIMIT")?,
        timeout: env.parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: env.required("DATABASE_URL")?,
        max_pool_size: env.parsed_or("DATABASE_MAX_POOL_SIZE", 10)?,
        connection_timeout_secs: env.parsed_or("DATABASE_CONNECTION_TIMEOUT_SECS", 5)?,
        statement_timeout_ms: env.parsed_or("DATABASE_STATEMENT_TIMEOUT_MS", 15_000)?,
    };

    let auth = Auth {
        jwt_secret: env.required("JWT_SECRET")?,
    };

    let ecpay = Ecpay {
        checkout_url: env.required("ECPAY_CHECKOUT_URL")?,
        return_url: env.required("ECPAY_RETURN_URL")?,
        client_back_url: env.required("ECPAY_CLIENT_BACK_URL")?,
        choose_payment: env.optional("ECPAY_CHOOSE_PAYMENT").unwrap_or_else(|| "ALL".to_string()),
    };

    let reconciliation = Reconciliation {
        cron_secret: env.optional("CRON_SECRET"),
    };

    let notifications = Notifications {
        line_channel_access_token: env.optional("LINE_CHANNEL_ACCESS_TOKEN"),
        max_attempts: env.parsed_or("NOTIFICATION_MAX_ATTEMPTS", 5)?,
        poll_interval_secs: env.parsed_or("NOTIFICATION_POLL_INTERVAL_SECS", 5)?,
        send_timeout_secs: env.parsed_or("NOTIFICATION_SEND_TIMEOUT_SECS", 10)?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        auth,
        ecpay,
        reconciliation,
        notifications,
    })
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are treated the same.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("{key} is invalid"))
    }

    fn parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.required(key)?
            .parse::<T>()
            .with_context(|| format!("{key} is invalid"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().with_context(|| format!("{key} is invalid")),
            None => Ok(default),
        }
    }
}
