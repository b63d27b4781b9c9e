//! Errors raised while constructing, rendering and wiring regions.

use luga_data::DataError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// The attachment node does not exist.
    #[error("region node '{0}' not found")]
    NodeNotFound(String),
    /// The data source id is not registered.
    #[error("no data source registered with id '{0}'")]
    UnknownSource(String),
    /// The template element (or remote template) cannot be found.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
    /// The template failed to compile.
    #[error("template error: {0}")]
    Template(String),
    /// Markup handed to the DOM could not be parsed.
    #[error("invalid markup: {0}")]
    Markup(String),
    /// A trait name has no registered implementation.
    #[error("unknown region trait '{0}'")]
    UnknownTrait(String),
    /// A declarative region node lacks a required attribute.
    #[error("region node '{node}' is missing attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },
    #[error(transparent)]
    Data(#[from] DataError),
}

pub type Result<T, E = RegionError> = std::result::Result<T, E>;
