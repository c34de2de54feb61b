use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Plain-text credential file: `"{username} {password} "` per user.
/// Passwords are stored and compared in clear text by design of the original
/// system; hardening is out of scope.
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Looks up a username, returning its password if present.
    pub fn lookup(&self, username: &str) -> Result<Option<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut tokens = contents.split_ascii_whitespace();
        while let Some(user) = tokens.next() {
            let Some(password) = tokens.next() else { break };
            if user == username {
                return Ok(Some(password.to_string()));
            }
        }
        Ok(None)
    }

    pub fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.lookup(username)?.is_some())
    }

    pub fn append(&self, username: &str, password: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(file, "{} {} ", username, password)?;
        Ok(())
    }
}
