// diag.rs — Unified diagnostics model
//
// Provides the diagnostic type the CLI renders for both fatal emission
// errors and tolerated pattern mismatches.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Source location ──────────────────────────────────────────────────────

/// Position of a declaration in the input program, as recorded upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0300`, `W0400`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Bundle could not be read or decoded.
    pub const E0100: DiagCode = DiagCode("E0100");
    /// User node without annotation.
    pub const E0200: DiagCode = DiagCode("E0200");
    /// Annotation names a kernel the unit does not define.
    pub const E0201: DiagCode = DiagCode("E0201");
    /// Annotation names a statement the unit does not define.
    pub const E0202: DiagCode = DiagCode("E0202");
    /// Statement or kernel names an array the program does not define.
    pub const E0203: DiagCode = DiagCode("E0203");
    /// Break statement does not point at a domain statement.
    pub const E0204: DiagCode = DiagCode("E0204");
    /// Array descriptor lists a different number of bounds than dimensions.
    pub const E0205: DiagCode = DiagCode("E0205");
    /// Array layout cannot be passed as a procedure argument.
    pub const E0300: DiagCode = DiagCode("E0300");
    /// Early-exit guard did not match the recognised shape.
    pub const W0400: DiagCode = DiagCode("W0400");
    /// Two loops in one function jump to the same early-exit label.
    pub const W0401: DiagCode = DiagCode("W0401");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub loc: Option<SourceLoc>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, location or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            loc: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the input location, if one is known.
    pub fn with_loc(mut self, loc: Option<SourceLoc>) -> Self {
        self.loc = loc;
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(loc) = &self.loc {
            write!(f, "\n  --> {}", loc)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
