// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Command must not be empty")]
    EmptyCommand,
}

pub type Result<T> = std::result::Result<T, DomainError>;
