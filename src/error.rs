use std::{error::Error as StdError, fmt};

use crate::api::Problem;

impl From<Problem> for eyre::Error {
    fn from(err: Problem) -> eyre::Error {
        eyre::eyre!("{err}")
    }
}

/// Classification of the conditions that abort a renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid operator input, reported before any I/O.
    Configuration,

    /// The stored certificate can not be a renewal target, e.g. it is a CA certificate.
    Precondition,

    /// Key reuse was requested but the stored key is missing or unreadable.
    KeyReuse,

    /// The issuance capability failed.
    Issuance,

    /// Reading from or writing to the certificate store failed.
    Storage,

    /// The post-renewal hook failed or timed out.
    Hook,

    /// Shutdown was signalled while waiting to renew.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Precondition => "precondition failed",
            ErrorKind::KeyReuse => "key reuse failed",
            ErrorKind::Issuance => "issuance failed",
            ErrorKind::Storage => "certificate storage error",
            ErrorKind::Hook => "renew hook failed",
            ErrorKind::Cancelled => "renewal cancelled",
        };

        f.write_str(kind)
    }
}

/// Error returned when a renewal is aborted.
///
/// The [`kind`](Error::kind) tells the stage that failed; the cause is kept as an
/// [`eyre::Report`].
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    cause: eyre::Report,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, cause: impl Into<eyre::Report>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }

    pub(crate) fn msg(kind: ErrorKind, msg: impl fmt::Display) -> Self {
        Self::new(kind, eyre::eyre!("{msg}"))
    }

    /// Returns the stage at which the renewal was aborted.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the underlying cause.
    pub fn cause(&self) -> &eyre::Report {
        &self.cause
    }

    /// Converts into the underlying report, dropping the kind.
    pub fn into_report(self) -> eyre::Report {
        self.cause.wrap_err(self.kind.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.cause)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let cause: &(dyn StdError + 'static) = &*self.cause;
        Some(cause)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attaches an [`ErrorKind`] to fallible results.
pub(crate) trait ResultExt<T> {
    fn kind(self, kind: ErrorKind) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<eyre::Report>,
{
    fn kind(self, kind: ErrorKind) -> Result<T> {
        self.map_err(|err| Error::new(kind, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_cause() {
        let err = Error::msg(ErrorKind::KeyReuse, "no key file");
        assert_eq!(err.kind(), ErrorKind::KeyReuse);
        assert_eq!(err.to_string(), "key reuse failed: no key file");
    }

    #[test]
    fn test_problem_into_report() {
        let problem = Problem {
            _type: "urn:ietf:params:acme:error:malformed".to_owned(),
            detail: Some("bad request".to_owned()),
            subproblems: None,
        };

        let report = eyre::Error::from(problem);
        assert_eq!(
            report.to_string(),
            "urn:ietf:params:acme:error:malformed: bad request"
        );
    }
}
