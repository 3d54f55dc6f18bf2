use std::fmt;

/// Status codes sent from server to client. Each control-phase reply is
/// exactly one of these, as a 4-byte big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 230
    LoggedIn,
    /// 430
    InvalidCredentials,
    /// 120: data phase beginning, or a filesystem command succeeded
    ServiceReady,
    /// 221
    Closing,
    /// 502: unsupported command, or a filesystem command failed
    NotImplemented,
    /// 125
    DataOpen,
    /// 226
    TransferComplete,
}

impl StatusCode {
    pub fn code(self) -> u32 {
        match self {
            StatusCode::LoggedIn => 230,
            StatusCode::InvalidCredentials => 430,
            StatusCode::ServiceReady => 120,
            StatusCode::Closing => 221,
            StatusCode::NotImplemented => 502,
            StatusCode::DataOpen => 125,
            StatusCode::TransferComplete => 226,
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            StatusCode::LoggedIn => "User logged in, proceed.",
            StatusCode::InvalidCredentials => "Invalid username or password.",
            StatusCode::ServiceReady => "Service ready in a minute.",
            StatusCode::Closing => "Service closing control connection.",
            StatusCode::NotImplemented => "Command not implemented.",
            StatusCode::DataOpen => "Data connection already open; transfer starting.",
            StatusCode::TransferComplete => {
                "Closing data connection. Requested file action successful."
            }
        }
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            230 => Ok(StatusCode::LoggedIn),
            430 => Ok(StatusCode::InvalidCredentials),
            120 => Ok(StatusCode::ServiceReady),
            221 => Ok(StatusCode::Closing),
            502 => Ok(StatusCode::NotImplemented),
            125 => Ok(StatusCode::DataOpen),
            226 => Ok(StatusCode::TransferComplete),
            other => Err(other),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.meaning())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in [120, 125, 221, 226, 230, 430, 502] {
            let status = StatusCode::try_from(code).unwrap();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(StatusCode::try_from(200), Err(200));
        assert_eq!(StatusCode::try_from(0), Err(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StatusCode::InvalidCredentials.to_string(),
            "430: Invalid username or password."
        );
    }
}
