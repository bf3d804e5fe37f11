use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How a document is put to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// One call per catalog batch, with a boolean and justification per category.
    #[default]
    Accuracy,
    /// One call per document returning the list of labels present.
    Cost,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid classification strategy '{0}': choose 'accuracy' or 'cost'")]
pub struct InvalidStrategy(pub String);

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Cost => "cost",
        }
    }
}

impl FromStr for Strategy {
    type Err = InvalidStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Self::Accuracy),
            "cost" => Ok(Self::Cost),
            _ => Err(InvalidStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
