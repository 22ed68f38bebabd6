use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

/// An ACME renewal information object.
///
/// See [draft-ietf-acme-ari §4.2].
///
/// # Example JSON
///
/// ```json
/// {
///   "suggestedWindow": {
///     "start": "2025-01-02T04:00:00Z",
///     "end": "2025-01-03T04:00:00Z"
///   },
///   "explanationURL": "https://acme.example.com/docs/ari"
/// }
/// ```
///
/// [draft-ietf-acme-ari §4.2]: https://datatracker.ietf.org/doc/html/draft-ietf-acme-ari#section-4.2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfo {
    /// The window in which the server would like the certificate renewed.
    pub suggested_window: SuggestedWindow,

    /// Page explaining why the window was chosen, e.g. after a mass revocation.
    #[serde(rename = "explanationURL", skip_serializing_if = "Option::is_none")]
    pub explanation_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl SuggestedWindow {
    /// Picks a uniformly random instant in `[start, end)`.
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> OffsetDateTime {
        let start = self.start.to_offset(UtcOffset::UTC);
        let width = (self.end - self.start).whole_nanoseconds();

        if width <= 0 {
            return start;
        }

        let width = i64::try_from(width).unwrap_or(i64::MAX);
        start + time::Duration::nanoseconds(rng.gen_range(0..width))
    }
}

impl RenewalInfo {
    /// Reduces the suggested window to a single renewal instant.
    ///
    /// Returns `now` when the selected instant has already passed, the selected instant when it
    /// falls within `willing_to_wait` of `now`, and `None` when renewal is not yet due.
    pub fn should_renew_at(
        &self,
        now: OffsetDateTime,
        willing_to_wait: Duration,
    ) -> Option<OffsetDateTime> {
        self.should_renew_at_with(&mut rand::thread_rng(), now, willing_to_wait)
    }

    pub(crate) fn should_renew_at_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: OffsetDateTime,
        willing_to_wait: Duration,
    ) -> Option<OffsetDateTime> {
        let now = now.to_offset(UtcOffset::UTC);
        let renew_at = self.suggested_window.pick(rng);

        if renew_at < now {
            return Some(now);
        }

        let wake_up = time::Duration::try_from(willing_to_wait)
            .ok()
            .and_then(|wait| now.checked_add(wait));

        match wake_up {
            Some(wake_up) if wake_up < renew_at => None,
            _ => Some(renew_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn info(start: OffsetDateTime, end: OffsetDateTime) -> RenewalInfo {
        RenewalInfo {
            suggested_window: SuggestedWindow { start, end },
            explanation_url: None,
        }
    }

    #[test]
    fn test_deserialize() {
        let info: RenewalInfo = serde_json::from_str(
            r#"{
            "suggestedWindow": {
                "start": "2025-01-02T04:00:00Z",
                "end": "2025-01-03T04:00:00Z"
            },
            "explanationURL": "https://acme.example.com/docs/ari"
            }"#,
        )
        .unwrap();

        assert_eq!(info.suggested_window.start, datetime!(2025-01-02 04:00 UTC));
        assert_eq!(info.suggested_window.end, datetime!(2025-01-03 04:00 UTC));
        assert_eq!(
            info.explanation_url.as_deref(),
            Some("https://acme.example.com/docs/ari")
        );
    }

    #[test]
    fn test_window_in_past_renews_now() {
        let now = datetime!(2025-02-01 00:00 UTC);
        let info = info(
            datetime!(2025-01-02 04:00 UTC),
            datetime!(2025-01-03 04:00 UTC),
        );

        assert_eq!(info.should_renew_at(now, Duration::ZERO), Some(now));
    }

    #[test]
    fn test_window_within_wait() {
        let now = datetime!(2025-01-01 00:00 UTC);
        let start = datetime!(2025-01-01 01:00 UTC);
        let end = datetime!(2025-01-01 02:00 UTC);
        let info = info(start, end);

        let renew_at = info
            .should_renew_at(now, Duration::from_secs(3 * 3600))
            .unwrap();
        assert!(renew_at >= start && renew_at < end);
    }

    #[test]
    fn test_window_beyond_wait() {
        let now = datetime!(2025-01-01 00:00 UTC);
        let info = info(
            datetime!(2025-01-10 00:00 UTC),
            datetime!(2025-01-11 00:00 UTC),
        );

        assert_eq!(info.should_renew_at(now, Duration::from_secs(3600)), None);
        assert_eq!(info.should_renew_at(now, Duration::ZERO), None);
    }

    #[test]
    fn test_empty_window_picks_start() {
        let now = datetime!(2025-01-01 00:00 UTC);
        let start = datetime!(2025-01-01 00:30 UTC);
        let info = info(start, start);

        assert_eq!(
            info.should_renew_at(now, Duration::from_secs(3600)),
            Some(start)
        );
    }
}
