use std::fmt;

use flc_codegen::CodegenError;
use flc_lower::LowerError;
use flc_typeck::TypeError;

/// The driver's top-level error: a thin wrapper naming which pipeline stage
/// failed, for a single-line diagnostic on stderr.
#[derive(Debug)]
pub enum DriverError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Type(TypeError),
    Lower(LowerError),
    Codegen(CodegenError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(e) => write!(f, "io error: {}", e),
            DriverError::Json(e) => write!(f, "malformed input: {}", e),
            DriverError::Type(e) => write!(f, "type error: {}", e),
            DriverError::Lower(e) => write!(f, "lowering error: {}", e),
            DriverError::Codegen(e) => write!(f, "codegen error: {}", e),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError::Json(e)
    }
}

impl From<TypeError> for DriverError {
    fn from(e: TypeError) -> Self {
        DriverError::Type(e)
    }
}

impl From<LowerError> for DriverError {
    fn from(e: LowerError) -> Self {
        DriverError::Lower(e)
    }
}

impl From<CodegenError> for DriverError {
    fn from(e: CodegenError) -> Self {
        DriverError::Codegen(e)
    }
}
