use std::error::Error;

use crate::llm::core::error::LlmError;
use crate::runtime::RuntimeError;

/// Best-effort check for "the provider is rate limiting us"
///
/// Typed errors anywhere in the source chain are checked first. Failing that,
/// any error whose `Debug` or `Display` text mentions `RateLimit` counts,
/// which catches foreign error types named like `RateLimitError`. The
/// fallback is a guess: a `false` does not prove the error is unrelated to
/// rate limiting.
pub fn is_rate_limit_error(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(runtime) = e.downcast_ref::<RuntimeError>() {
            if matches!(runtime, RuntimeError::RateLimited { .. }) {
                return true;
            }
        }
        if let Some(llm) = e.downcast_ref::<LlmError>() {
            if llm.is_rate_limited() {
                return true;
            }
        }
        if format!("{:?}", e).contains("RateLimit") || e.to_string().contains("RateLimit") {
            return true;
        }
        current = e.source();
    }
    false
}
