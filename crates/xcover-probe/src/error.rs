use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[cfg(target_os = "linux")]
    #[error("failed to load instrumentation object: {0}")]
    Load(#[from] aya::EbpfError),

    #[cfg(target_os = "linux")]
    #[error("program {name} not found in instrumentation object")]
    ProgramNotFound { name: &'static str },

    #[cfg(target_os = "linux")]
    #[error("failed to load program: {0}")]
    ProgramLoad(#[from] aya::programs::ProgramError),

    #[cfg(target_os = "linux")]
    #[error("failed to attach uprobe: {0}")]
    Attach(String),

    #[cfg(target_os = "linux")]
    #[error("map {name} not found in instrumentation object")]
    MapNotFound { name: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("uprobes are only supported on linux")]
    NotSupported,
}

impl From<ProbeError> for xcover_core::CoreError {
    fn from(err: ProbeError) -> Self {
        let message = err.to_string();
        match err {
            ProbeError::Io(io) => xcover_core::CoreError::Io(io),
            #[cfg(target_os = "linux")]
            ProbeError::Attach(_) => xcover_core::CoreError::AttachFailed(message),
            _ => xcover_core::CoreError::LoadFailed(message),
        }
    }
}
