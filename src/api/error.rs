use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("payload cannot be sent as a query string: {0}")]
    InvalidQuery(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;
