//! Login attempt counting with a temporary lockout.
//!
//! The guard only counts attempts; there is no password hashing, no user
//! database and no rate limiting beyond the lockout window.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

// ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoginError {
    // ---
    #[error("invalid credentials ({remaining} attempts remaining)")]
    InvalidCredentials { remaining: u32 },

    #[error("too many failed attempts, locked until {until}")]
    LockedOut { until: DateTime<Utc> },
}

#[derive(Debug)]
pub struct LoginGuard {
    // ---
    username: String,
    password: String,
    max_attempts: u32,
    lockout: Duration,
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl LoginGuard {
    // ---
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        max_attempts: u32,
        lockout_secs: u32,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            max_attempts: max_attempts.max(1),
            lockout: Duration::seconds(i64::from(lockout_secs)),
            failed_attempts: 0,
            locked_until: None,
        }
    }

    /// Check one login attempt made at `now`.
    ///
    /// While locked, attempts are refused without looking at the credentials.
    /// The lock lifts once `now` reaches the deadline, and the failure count
    /// starts over.
    pub fn attempt(&mut self, username: &str, password: &str, now: DateTime<Utc>) -> Result<(), LoginError> {
        // ---
        if let Some(until) = self.locked_until {
            if now < until {
                return Err(LoginError::LockedOut { until });
            }
            info!("Login lockout expired");
            self.locked_until = None;
            self.failed_attempts = 0;
        }

        if username == self.username && password == self.password {
            self.failed_attempts = 0;
            info!("Login succeeded for '{}'", username);
            return Ok(());
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= self.max_attempts {
            let until = now + self.lockout;
            self.locked_until = Some(until);
            warn!(
                "Login locked after {} failed attempts, until {}",
                self.failed_attempts, until
            );
            return Err(LoginError::LockedOut { until });
        }

        warn!(
            "Failed login attempt {}/{} for '{}'",
            self.failed_attempts, self.max_attempts, username
        );
        Err(LoginError::InvalidCredentials {
            remaining: self.max_attempts - self.failed_attempts,
        })
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap()
    }

    #[test]
    fn test_correct_credentials_succeed() {
        // ---
        let mut guard = LoginGuard::new("admin", "password", 3, 300);
        assert!(guard.attempt("admin", "password", t0()).is_ok());
        assert_eq!(guard.failed_attempts(), 0);
    }

    #[test]
    fn test_lockout_after_max_failures() {
        // ---
        let mut guard = LoginGuard::new("admin", "password", 3, 300);

        assert_eq!(
            guard.attempt("admin", "nope", t0()),
            Err(LoginError::InvalidCredentials { remaining: 2 })
        );
        assert_eq!(
            guard.attempt("admin", "nope", t0()),
            Err(LoginError::InvalidCredentials { remaining: 1 })
        );

        let until = t0() + Duration::seconds(300);
        assert_eq!(
            guard.attempt("admin", "nope", t0()),
            Err(LoginError::LockedOut { until })
        );
        assert!(guard.is_locked(t0()));

        // Correct credentials are refused while locked
        assert_eq!(
            guard.attempt("admin", "password", t0() + Duration::seconds(299)),
            Err(LoginError::LockedOut { until })
        );
    }

    #[test]
    fn test_lockout_expires() {
        // ---
        let mut guard = LoginGuard::new("admin", "password", 2, 60);
        let _ = guard.attempt("x", "y", t0());
        let _ = guard.attempt("x", "y", t0());
        assert!(guard.is_locked(t0()));

        let later = t0() + Duration::seconds(60);
        assert!(!guard.is_locked(later));
        assert!(guard.attempt("admin", "password", later).is_ok());
        assert_eq!(guard.failed_attempts(), 0);
    }

    #[test]
    fn test_success_resets_counter() {
        // ---
        let mut guard = LoginGuard::new("admin", "password", 3, 300);
        let _ = guard.attempt("admin", "bad", t0());
        let _ = guard.attempt("admin", "bad", t0());
        assert!(guard.attempt("admin", "password", t0()).is_ok());

        assert_eq!(
            guard.attempt("admin", "bad", t0()),
            Err(LoginError::InvalidCredentials { remaining: 2 })
        );
    }
}
