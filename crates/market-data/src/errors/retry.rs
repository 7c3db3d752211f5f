/// Classification for retry policy.
///
/// Used by callers of a [`RateProvider`](crate::provider::RateProvider) to
/// decide whether a failed fetch is worth repeating.
///
/// | Class | Retry the same call? |
/// |-------|----------------------|
/// | `Never` | No, surface the error |
/// | `WithBackoff` | Yes, after sleeping the backoff interval |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Terminal for this call: transport failure, bad status, unparseable body.
    Never,

    /// Upstream asked us to slow down (HTTP 429).
    /// The identical request may succeed after waiting.
    WithBackoff,
}
