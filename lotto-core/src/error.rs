use thiserror::Error;

pub type Result<T> = std::result::Result<T, LottoError>;

#[derive(Error, Debug)]
pub enum LottoError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Draw log is empty")]
    EmptyLog,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("Invalid session id")]
    BadSession,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LottoError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    pub fn invalid_bet(msg: impl Into<String>) -> Self {
        Self::InvalidBet(msg.into())
    }

    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Closed enumeration of result codes reported to clients. The byte values
/// are part of the wire protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    NotLoggedIn = 0x00,
    AlreadyLoggedIn = 0x01,
    BadSession = 0x02,
    BadCredentials = 0x03,
    ThirdStrike = 0x04,
    IpBlocked = 0x05,
    UsernameTaken = 0x06,
    Empty = 0x07,
    Internal = 0xFE,
    Malformed = 0xFF,
}

impl ErrorCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl From<&LottoError> for ErrorCode {
    fn from(err: &LottoError) -> Self {
        match err {
            LottoError::UsernameTaken(_) => ErrorCode::UsernameTaken,
            LottoError::EmptyLog => ErrorCode::Empty,
            LottoError::NotLoggedIn => ErrorCode::NotLoggedIn,
            LottoError::AlreadyLoggedIn => ErrorCode::AlreadyLoggedIn,
            LottoError::BadSession => ErrorCode::BadSession,
            LottoError::MalformedRequest(_)
            | LottoError::MalformedRecord(_)
            | LottoError::InvalidBet(_) => ErrorCode::Malformed,
            _ => ErrorCode::Internal,
        }
    }
}
