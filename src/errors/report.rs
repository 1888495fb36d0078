// src/errors/report.rs
//! Rendering utilities for miette diagnostics.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};

/// Create a handler for terminal output (unicode + colors).
fn terminal_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::unicode(),
        styles: ThemeStyles::ansi(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Create a handler for snapshot testing (ascii + no colors).
fn snapshot_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::ascii(),
        styles: ThemeStyles::none(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Render to stderr with unicode/colors.
pub fn render_to_stderr(report: &dyn Diagnostic) {
    let handler = terminal_handler();
    let mut output = String::new();
    if handler.render_report(&mut output, report).is_ok() {
        eprint!("{}", output);
    }
}

/// Render to a buffer without colors (for snapshots/testing).
pub fn render_to_string(report: &dyn Diagnostic) -> String {
    let handler = snapshot_handler();
    let mut output = String::new();
    let _ = handler.render_report(&mut output, report);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SemanticError;

    #[test]
    fn render_semantic_error_to_string() {
        let err = SemanticError::UndeclaredIdentifier {
            name: "foo".to_string(),
            span: (0, 3).into(),
        };

        let output = render_to_string(&err);
        assert!(output.contains("E2002"), "should contain error code");
        assert!(
            output.contains("undeclared identifier"),
            "should contain message"
        );
        assert!(output.contains("foo"), "should contain the name");
    }

    #[test]
    fn render_with_help() {
        let err = SemanticError::UnprintableType {
            found: "SomeClass".to_string(),
            span: (0, 5).into(),
        };

        let output = render_to_string(&err);
        assert!(output.contains("E2027"), "should contain error code");
        assert!(output.contains("help"), "should contain help text");
    }
}
