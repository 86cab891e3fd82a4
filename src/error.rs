use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    #[error("Invalid operation")]
    InvalidOperation,
    #[error("Invalid door index")]
    InvalidDoorIndex,
    #[error("Custom profile requires a configuration")]
    MissingCustomConfig,
    #[error("Invalid custom configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Impossible state")]
    Impossible,
}

/// 自定义主持人配置的校验错误
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("at least 3 doors are required, got {doors}")]
    TooFewDoors { doors: u32 },
    #[error("at most {max} doors are supported, got {doors}")]
    TooManyDoors { doors: u32, max: u32 },
    #[error("openChance must be within [0, 1] (currently {value})")]
    OpenChanceOutOfRange { value: f64 },
    #[error("{field} must be a finite, non-negative probability (currently {value})")]
    InvalidProbability { field: String, value: f64 },
    #[error("when playerPick == prizeDoor, probabilities must sum to 1 (currently {sum:.4})")]
    PickedPrizeSum { sum: f64 },
    #[error("when playerPick != prizeDoor, probabilities must sum to 1 (currently {sum:.4})")]
    PickedOtherSum { sum: f64 },
    #[error("unknown prize probabilities must sum to <= 1 (currently {sum:.4})")]
    UnknownPrizeSum { sum: f64 },
    #[error("unknown prize weights cover {weights} doors but the game has {doors}")]
    DoorCountMismatch { weights: usize, doors: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
