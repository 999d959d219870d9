use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario parse error: {0}")]
    Parse(String),

    #[error("hour {hour} for key {key:?} is outside 0..=23")]
    Hour { key: String, hour: u32 },

    #[error("blend weight {0} is not a number in [0, 1]")]
    Weight(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
