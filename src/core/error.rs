//! Error handling for inheritance resolution
//!
//! Two error types cross the public API:
//! - [`InheritanceError`] - every way resolving a template chain can fail
//! - [`LoadError`] - failures reported by a [`TemplateLoader`](crate::loader::TemplateLoader)
//!
//! None of these are retried. Cache misses are never errors, and two `super()`
//! situations deliberately degrade to empty output instead of failing: a call
//! inside a block of a template with no parent, and a call whose block has no
//! ancestor definition.
//!
//! For host applications that want readable diagnostics, [`user_friendly_error`]
//! turns an [`anyhow::Error`] carrying one of these types into an
//! [`ErrorContext`] with details and a suggestion.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tpl_inherit::core::{InheritanceError, user_friendly_error};
//!
//! let error = InheritanceError::CircularInheritance {
//!     name: "a.html".to_string(),
//!     chain: vec!["a.html".to_string(), "b.html".to_string()],
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored output on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::ast::Location;

/// Failures while turning a template chain into one resolved tree.
#[derive(Error, Debug)]
pub enum InheritanceError {
    /// A template name reappeared while following `extends`.
    ///
    /// `chain` lists the templates walked before the repeat, child first.
    #[error("Circular inheritance detected: {name} (chain: {})", .chain.join(" -> "))]
    CircularInheritance {
        name: String,
        chain: Vec<String>,
    },

    /// The loader could not produce a parent template.
    #[error("Failed to load parent template '{parent}' extended by '{child}'")]
    ParentLoad {
        parent: String,
        child: String,
        #[source]
        source: LoadError,
    },

    /// Evaluating a dynamic `extends` expression failed.
    #[error("Failed to evaluate dynamic extends target in '{template}'")]
    DynamicExtendsEvaluation {
        template: String,
        #[source]
        source: anyhow::Error,
    },

    /// A dynamic `extends` expression produced something other than a string.
    #[error("Dynamic extends target in '{template}' must be a string, got {found}")]
    DynamicExtendsType {
        template: String,
        found: &'static str,
    },

    /// The merger was handed a hierarchy without a root. Indicates a builder bug.
    #[error("No root template found in hierarchy")]
    NoRootTemplate,

    /// `super()` used where no enclosing block exists.
    #[error("super() call outside of block context{}", format_location(.template.as_deref(), .location.as_ref()))]
    SuperOutsideBlock {
        template: Option<String>,
        location: Option<Location>,
    },

    /// Nested `super()` substitution went deeper than the configured limit.
    #[error("super() call depth exceeded in block '{block}' (limit {limit}, possible infinite recursion)")]
    SuperDepthExceeded {
        block: String,
        limit: usize,
    },
}

fn format_location(template: Option<&str>, location: Option<&Location>) -> String {
    match (template, location) {
        (Some(name), Some(loc)) => format!(" in '{name}' at line {}, column {}", loc.line, loc.column),
        (Some(name), None) => format!(" in '{name}'"),
        (None, Some(loc)) => format!(" at line {}, column {}", loc.line, loc.column),
        (None, None) => String::new(),
    }
}

impl InheritanceError {
    /// True for errors caused by template content rather than by the host
    /// (loader failures) or by this crate itself.
    #[must_use]
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            InheritanceError::CircularInheritance { .. }
                | InheritanceError::DynamicExtendsType { .. }
                | InheritanceError::SuperOutsideBlock { .. }
                | InheritanceError::SuperDepthExceeded { .. }
        )
    }
}

/// Errors reported by template loaders.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Template not found: {name}")]
    NotFound { name: String },

    #[error("Failed to load template '{name}'")]
    Failed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    pub fn not_found(name: impl Into<String>) -> Self {
        LoadError::NotFound { name: name.into() }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

/// An error with a human-oriented explanation and a suggested fix.
#[derive(Debug)]
pub struct ErrorContext {
    /// Rendered message of the underlying error, including its source chain
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`], adding details and a
/// suggestion when the error (or one of its causes) is an
/// [`InheritanceError`] or [`LoadError`].
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(inheritance) = cause.downcast_ref::<InheritanceError>() {
            return inheritance_context(inheritance, message);
        }
        if let Some(load) = cause.downcast_ref::<LoadError>() {
            return load_context(load, message);
        }
    }

    ErrorContext::new(message)
}

fn inheritance_context(error: &InheritanceError, message: String) -> ErrorContext {
    let ctx = ErrorContext::new(message);
    match error {
        InheritanceError::CircularInheritance { name, .. } => ctx
            .with_details(format!("'{name}' extends itself directly or through its parents"))
            .with_suggestion("Remove the extends declaration that closes the loop"),
        InheritanceError::ParentLoad { parent, source, .. } => {
            let ctx = ctx.with_details(format!("The loader reported: {source}"));
            if source.is_not_found() {
                ctx.with_suggestion(format!(
                    "Check the spelling of '{parent}' and that the loader can see it"
                ))
            } else {
                ctx.with_suggestion("Inspect the loader error above; it is not retried")
            }
        }
        InheritanceError::DynamicExtendsEvaluation { .. } => ctx.with_suggestion(
            "Make sure every variable used by the extends expression is bound in the render context",
        ),
        InheritanceError::DynamicExtendsType { found, .. } => ctx
            .with_details(format!("The extends expression evaluated to a {found}"))
            .with_suggestion("Bind the layout variable to a template name string"),
        InheritanceError::NoRootTemplate => ctx
            .with_details("A hierarchy reached the merger without any template in it")
            .with_suggestion("This is an internal error; please report it with the template chain"),
        InheritanceError::SuperOutsideBlock { .. } => ctx
            .with_details("super() refers to the parent's version of the enclosing block")
            .with_suggestion("Move the super() call inside a {% block %}"),
        InheritanceError::SuperDepthExceeded { block, .. } => ctx
            .with_details(format!("Block '{block}' chains super() calls deeper than allowed"))
            .with_suggestion("Reduce the inheritance depth or raise max_super_depth in the configuration"),
    }
}

fn load_context(error: &LoadError, message: String) -> ErrorContext {
    match error {
        LoadError::NotFound { name } => ErrorContext::new(message)
            .with_suggestion(format!("Register '{name}' with the template loader")),
        LoadError::Failed { .. } => ErrorContext::new(message),
    }
}
