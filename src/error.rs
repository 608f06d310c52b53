use thiserror::Error;

/// Failures reported by tree lookups and removals.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("no element with such key found")]
    NotFound,
}

/// Failures reported by the command shell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("incorrect command: {0}")]
    InvalidCommand(String),

    #[error("element with key {0} does not exist and can't be removed")]
    NothingToRemove(i32),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
