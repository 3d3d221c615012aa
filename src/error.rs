use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid value {value:?} for {key}")]
    Config { key: &'static str, value: String },
}
