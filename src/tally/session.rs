// Password gate in front of a run.

use crate::tally::*;

/// The environment variable holding the expected password. When it is not
/// set, runs are not gated.
pub const PASSWORD_ENV: &str = "BJTALLY_PASSWORD";

/// The state of one access attempt.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Session {
    /// `None` until a password has been submitted.
    pub password_correct: Option<bool>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.password_correct == Some(true)
    }
}

/// Records the outcome of a submitted password, if any, and tells whether the
/// session may proceed.
pub fn check_password(session: &mut Session, attempt: Option<&str>, expected: &str) -> bool {
    if let Some(a) = attempt {
        session.password_correct = Some(a == expected);
    }
    session.is_authenticated()
}

pub fn authorize(
    session: &mut Session,
    attempt: Option<&str>,
    expected: Option<&str>,
) -> TallyResult<()> {
    match expected {
        None => {
            debug!("authorize: no password configured");
            Ok(())
        }
        Some(e) => {
            let ok = check_password(session, attempt, e);
            if !ok {
                warn!("Access denied (password given: {})", attempt.is_some());
            }
            ensure!(ok, AccessDeniedSnafu {});
            Ok(())
        }
    }
}
