#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("processor '{0}' not available")]
    UnknownProcessor(String),

    #[error("can not load empty processor")]
    EmptyProcessor,

    #[error("multiple processors")]
    MultipleProcessors,

    #[error("no processors")]
    NoProcessors,

    #[error("{processor} not supported on '{target}' target")]
    UnsupportedTarget {
        processor: &'static str,
        target: &'static str,
    },

    #[error("event format '{0}' not supported")]
    UnsupportedEventFormat(String),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
