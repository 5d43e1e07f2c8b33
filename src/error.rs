use thiserror::Error;

/// Failure taxonomy for the capture → recognize → parse → save pipeline.
///
/// Every variant is caught at the CLI boundary and rendered as a message;
/// nothing here is allowed to abort the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read image {path}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {path} as an image")]
    ImageDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("image file {0} is empty")]
    EmptyImage(String),

    #[error("recognizer request failed")]
    Network(#[from] reqwest::Error),

    #[error("recognizer returned HTTP {0}")]
    ApiStatus(u16),

    #[error("recognizer returned an empty response body")]
    EmptyResponse,

    #[error("recognizer response was not valid JSON")]
    MalformedEnvelope(#[from] serde_json::Error),

    #[error("malformed recognizer response: missing `{0}`")]
    MissingField(&'static str),

    #[error("meal {0} not found")]
    MealNotFound(i64),

    #[error("cannot save meal: {0}")]
    InvalidMeal(&'static str),

    #[error("{0} is not valid in the current session state")]
    SessionState(&'static str),

    #[error("database error")]
    Db(#[from] sqlx::Error),
}
