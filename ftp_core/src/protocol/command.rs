use std::fmt;

use super::constants::TOKEN_LEN;

/// The fixed command vocabulary. Every token is exactly four ASCII bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Identity half of a credential submission
    Account,
    /// Secret half of a credential submission
    Password,
    List,
    /// Answered by the client itself, never sent
    Help,
    Quit,
    Retrieve,
    Store,
    /// Create a file (append with create)
    Append,
    Delete,
    MakeDir,
    RemoveDir,
    ChangeDir,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Account,
        Command::Password,
        Command::List,
        Command::Help,
        Command::Quit,
        Command::Retrieve,
        Command::Store,
        Command::Append,
        Command::Delete,
        Command::MakeDir,
        Command::RemoveDir,
        Command::ChangeDir,
    ];

    pub fn token(self) -> &'static [u8; TOKEN_LEN] {
        match self {
            Command::Account => b"ACCT",
            Command::Password => b"PAWD",
            Command::List => b"LIST",
            Command::Help => b"HELP",
            Command::Quit => b"QUIT",
            Command::Retrieve => b"RETR",
            Command::Store => b"STOR",
            Command::Append => b"APPE",
            Command::Delete => b"DELE",
            Command::MakeDir => b"MKDR",
            Command::RemoveDir => b"RMDR",
            Command::ChangeDir => b"CWDR",
        }
    }

    /// Exact match against the vocabulary. Case is not folded here;
    /// senders upper-case their input.
    pub fn from_token(token: &[u8; TOKEN_LEN]) -> Option<Command> {
        Self::ALL.into_iter().find(|cmd| cmd.token() == token)
    }

    /// Case-insensitive lookup for user input
    pub fn parse(input: &str) -> Option<Command> {
        let bytes = input.as_bytes();
        if bytes.len() != TOKEN_LEN {
            return None;
        }
        let mut token = [0u8; TOKEN_LEN];
        for (dst, src) in token.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Self::from_token(&token)
    }

    pub fn as_str(self) -> &'static str {
        // Tokens are ASCII literals
        std::str::from_utf8(self.token()).unwrap_or("????")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
