use secrecy::SecretString;

use crate::auth::config::AuthConfig;

pub mod server;

/// What the CLI resolved to run.
#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        signing_key: SecretString,
        config: AuthConfig,
    },
}
