use std::error::Error as StdError;

/// Common error type for a sync run.
///
/// `Upstream` and `Downstream` carry the failing response's status code and
/// body verbatim; the CLI surfaces them unmodified before exiting, and the
/// documented recovery path is to fix the triggering condition and re-run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected response from engage: {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected response from loop: {status}: {body}")]
    Downstream { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
