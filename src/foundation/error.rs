/// Convenience result type used across the store, schema, and explorer APIs.
pub type CinemaResult<T> = Result<T, CinemaError>;

/// Top-level error taxonomy used by store and exploration APIs.
#[derive(thiserror::Error, Debug)]
pub enum CinemaError {
    /// Invalid parameter definition, value domain, dependency rule, or name pattern.
    #[error("schema error: {0}")]
    Schema(String),

    /// Operation not allowed in the store's current lifecycle state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A descriptor or query that cannot be mapped onto the store's address space.
    #[error("query error: {0}")]
    Query(String),

    /// A document payload the store cannot persist.
    #[error("payload error: {0}")]
    Payload(String),

    /// A track failed while the explorer was producing a document.
    #[error("traversal aborted at {descriptor}: {source}")]
    Traversal {
        /// Textual form of the descriptor being produced.
        descriptor: String,
        /// The track's own error.
        #[source]
        source: Box<CinemaError>,
    },

    /// Errors when serializing or deserializing the schema file or sidecars.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CinemaError {
    /// Build a [`CinemaError::Schema`] value.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Build a [`CinemaError::IllegalState`] value.
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Build a [`CinemaError::Query`] value.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Build a [`CinemaError::Payload`] value.
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }

    /// Build a [`CinemaError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap a track failure together with the descriptor it was producing.
    pub fn traversal(descriptor: impl Into<String>, source: CinemaError) -> Self {
        Self::Traversal {
            descriptor: descriptor.into(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for CinemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
