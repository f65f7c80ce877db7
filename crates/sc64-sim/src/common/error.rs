//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;
use crate::link::LinkError;

/// Simulator error, with a script location where one applies
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    #[error("Expectation failed at {span:?}: {message}")]
    Expectation { message: String, span: Span },

    #[error("Device error at {span:?}: {message}")]
    Device { message: String, span: Span },

    #[error("Link error at {span:?}: {source}")]
    Link {
        #[source]
        source: LinkError,
        span: Span,
    },
}

impl SimError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn expectation(message: impl Into<String>, span: Span) -> Self {
        Self::Expectation {
            message: message.into(),
            span,
        }
    }

    pub fn device(message: impl Into<String>, span: Span) -> Self {
        Self::Device {
            message: message.into(),
            span,
        }
    }

    pub fn link(source: LinkError, span: Span) -> Self {
        Self::Link { source, span }
    }

    /// Script location of the error
    pub fn span(&self) -> Span {
        match self {
            Self::Lexer { span, .. }
            | Self::Parser { span, .. }
            | Self::Expectation { span, .. }
            | Self::Device { span, .. }
            | Self::Link { span, .. } => *span,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &SimError) {
        let diagnostic = match error {
            SimError::Lexer { message, span } => Diagnostic::error()
                .with_message("Lexer error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            SimError::Parser { message, span } => Diagnostic::error()
                .with_message("Syntax error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            SimError::Expectation { message, span } => Diagnostic::error()
                .with_message("Expectation failed")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            SimError::Device { message, span } => Diagnostic::error()
                .with_message("Device error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            SimError::Link { source, span } => Diagnostic::error()
                .with_message("Link error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(source.to_string())
                ]),
        };

        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
