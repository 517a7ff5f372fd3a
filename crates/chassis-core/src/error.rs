use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Document structure errors
    #[error("Missing required attribute '{attribute}' on node '{node}'")]
    MissingAttribute { node: String, attribute: String },

    #[error("Invalid value '{value}' for attribute '{attribute}' on node '{node}'")]
    InvalidAttribute {
        node: String,
        attribute: String,
        value: String,
    },

    #[error("Unknown {kind}: {value}")]
    UnknownVocabulary { kind: &'static str, value: String },

    #[error("Unknown reset type index: {0}")]
    UnknownResetType(u32),

    // Topology resolution errors
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    // Loader errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn missing_attribute(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            node: node.into(),
            attribute: attribute.into(),
        }
    }

    pub fn invalid_attribute(
        node: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            node: node.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVocabulary {
            kind,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
