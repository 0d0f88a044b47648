use thiserror::Error;

/// Stable error taxonomy for the trace engine (spec §7).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("exe path is empty")]
    ExePathEmpty,

    #[error("elf file is nil")]
    ElfFileNil,

    #[error("no symbols found in executable (stripped binary?)")]
    NoSymbols,

    #[error("no function symbols survived filtering")]
    NoFunctionSymbols,

    #[error("no function offsets could be resolved")]
    NoOffsets,

    #[error("cookie collision: {name} collides with {existing} (cookie {cookie:#x})")]
    CookieCollision {
        name: String,
        existing: String,
        cookie: u64,
    },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("failed to load instrumentation object: {0}")]
    LoadFailed(String),

    #[error("failed to attach probe batch: {0}")]
    AttachFailed(String),

    #[error("function not found for cookie {0:#x}")]
    FuncNotFoundForCookie(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] xcover_common::CommonError),
}
