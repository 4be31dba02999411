use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("invalid repository id: {0}")]
    InvalidRepoId(String),

    #[error("no repository ids to process")]
    EmptyRepoList,

    #[error("cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    Download(String),

    #[error("extract failed: {0}")]
    Extract(String),

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, MineError>;

/// Failure to turn one source file into a syntax tree.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not valid utf-8")]
    Encoding(String),

    #[error("python grammar could not be loaded: {0}")]
    Language(String),

    #[error("syntax error at line {line}")]
    Syntax { line: usize },

    #[error("parse timed out")]
    TimedOut,
}
