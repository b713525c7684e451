use teamswitch_core::CoreError;
use thiserror::Error;

/// Problems that stop the bot before it connects to Discord.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not build http client for backend '{name}': {source}")]
    HttpClient {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
