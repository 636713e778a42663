//! `Secret<T>` resists accidental logging of API keys and webhook URLs.
//! Storage itself keeps these in the clear (§4.1 — "secret-redaction is the
//! logger's job"); this newtype is the in-process guard against a stray
//! `{:?}`/`{}` leaking one into a log line or error message.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Secret(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***REDACTED***)")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

impl<T: PartialEq> PartialEq for Secret<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_never_expose_the_value() {
        let s = Secret::new("sk-super-secret-key".to_string());
        assert_eq!(format!("{:?}", s), "Secret(***REDACTED***)");
        assert_eq!(format!("{}", s), "***REDACTED***");
    }

    #[test]
    fn expose_returns_the_real_value() {
        let s = Secret::new("sk-super-secret-key".to_string());
        assert_eq!(s.expose(), "sk-super-secret-key");
    }
}
