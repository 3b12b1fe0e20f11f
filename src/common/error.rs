use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Seq2SeqError {
    #[error("Endpoint not available error: {0}")]
    FileDownloadError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Tch tensor error: {0}")]
    TchError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Value error: {0}")]
    ValueError(String),
}

impl From<cached_path::Error> for Seq2SeqError {
    fn from(error: cached_path::Error) -> Self {
        Seq2SeqError::FileDownloadError(error.to_string())
    }
}

impl From<std::io::Error> for Seq2SeqError {
    fn from(error: std::io::Error) -> Self {
        Seq2SeqError::IOError(error.to_string())
    }
}

impl From<serde_json::Error> for Seq2SeqError {
    fn from(error: serde_json::Error) -> Self {
        Seq2SeqError::InvalidConfigurationError(error.to_string())
    }
}

impl From<TokenizerError> for Seq2SeqError {
    fn from(error: TokenizerError) -> Self {
        Seq2SeqError::TokenizerError(error.to_string())
    }
}

impl From<TchError> for Seq2SeqError {
    fn from(error: TchError) -> Self {
        Seq2SeqError::TchError(error.to_string())
    }
}
