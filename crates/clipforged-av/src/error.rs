//! Error types for clipforged-av.
//!
//! The first five variants are resolution-time errors: they are reported to
//! the caller and nothing is executed. `TemplateRender` is a catalog defect
//! that fails only the request that hit it. Execution results are not errors;
//! they are [`Outcome`](crate::Outcome)s.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving, building or staging a job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No recipe is registered under the requested name.
    #[error("unknown recipe: {name}")]
    UnknownRecipe { name: String },

    /// A required slot had no upload, no value and no default.
    #[error("missing required parameter: {slot}")]
    MissingRequiredParameter { slot: String },

    /// An enumerated slot received a value outside its allowed set.
    #[error("invalid value for {slot}: expected one of {allowed}")]
    InvalidEnumValue { slot: String, allowed: String },

    /// A numeric slot received a value that does not match its format.
    #[error("malformed numeric parameter {slot}: {reason}")]
    MalformedNumericParameter { slot: String, reason: String },

    /// A path-valued slot (or output name) did not come from the file store.
    #[error("unsafe path for {slot}: {reason}")]
    UnsafePathParameter { slot: String, reason: String },

    /// A recipe asked for a placeholder its slots and parameters do not provide.
    #[error("template render error in {recipe}: {message}")]
    TemplateRender { recipe: String, message: String },

    /// An upload was refused by the file store.
    #[error("unsupported upload: {filename}")]
    UnsupportedUpload { filename: String },

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unknown recipe error.
    pub fn unknown_recipe(name: impl Into<String>) -> Self {
        Self::UnknownRecipe { name: name.into() }
    }

    /// Create a missing parameter error.
    pub fn missing(slot: impl Into<String>) -> Self {
        Self::MissingRequiredParameter { slot: slot.into() }
    }

    /// Create a malformed numeric parameter error.
    pub fn malformed(slot: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedNumericParameter {
            slot: slot.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsafe path error.
    pub fn unsafe_path(slot: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafePathParameter {
            slot: slot.into(),
            reason: reason.into(),
        }
    }

    /// Create a template render error.
    pub fn render(recipe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            recipe: recipe.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRecipe { .. } => "UnknownRecipe",
            Self::MissingRequiredParameter { .. } => "MissingRequiredParameter",
            Self::InvalidEnumValue { .. } => "InvalidEnumValue",
            Self::MalformedNumericParameter { .. } => "MalformedNumericParameter",
            Self::UnsafePathParameter { .. } => "UnsafePathParameter",
            Self::TemplateRender { .. } => "TemplateRenderError",
            Self::UnsupportedUpload { .. } => "UnsupportedUpload",
            Self::ToolNotFound { .. } => "ToolNotFound",
            Self::Io(_) => "Io",
        }
    }

    /// Whether the caller can fix the request and try again.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownRecipe { .. }
                | Self::MissingRequiredParameter { .. }
                | Self::InvalidEnumValue { .. }
                | Self::MalformedNumericParameter { .. }
                | Self::UnsafePathParameter { .. }
                | Self::UnsupportedUpload { .. }
        )
    }
}
