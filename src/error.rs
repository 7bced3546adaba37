// MIT License - Copyright (c) 2026 Peter Wright

/// All errors that can occur in the pilight-console library.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The unterminated tail of a stream outgrew the framer's limit and
    /// was discarded. Lines completed before the oversized tail are
    /// carried in `recovered` so the caller can still dispatch them.
    #[error("Framing overflow: unterminated message exceeds {limit} bytes")]
    FramingOverflow { limit: usize, recovered: Vec<String> },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
