use crate::api::new;
use crate::cli::actions::Action;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            signing_key,
            config,
        } => {
            // Fail fast on an unparseable DSN instead of inside the pool.
            let dsn = Url::parse(&dsn)?;

            new(port, dsn.to_string(), signing_key, config).await?;
        }
    }

    Ok(())
}
