//! Ordered-fallback executor.
//!
//! OCR parameter variants and Gemini model candidates share one shape:
//! try candidates in order, stop at the first success, and give up early
//! on a failure that a later candidate cannot fix.

use std::fmt::Display;
use std::future::Future;

/// Why an ordered run produced no value.
#[derive(Debug)]
pub enum FallbackError<E> {
    /// A non-retryable failure on the candidate at `index`. Later candidates
    /// were not tried.
    Fatal { index: usize, error: E },
    /// Every candidate failed retryably. Errors are in candidate order.
    Exhausted { errors: Vec<E> },
}

impl<E> FallbackError<E> {
    /// Number of candidates that were actually tried.
    pub fn attempts(&self) -> usize {
        match self {
            Self::Fatal { index, .. } => index + 1,
            Self::Exhausted { errors } => errors.len(),
        }
    }

    /// Every recorded error, numbered by attempt and joined with `"; "`.
    /// `None` when no candidate was tried.
    pub fn summary(&self) -> Option<String>
    where
        E: Display,
    {
        match self {
            Self::Fatal { index, error } => Some(format!("#{}: {error}", index + 1)),
            Self::Exhausted { errors } if errors.is_empty() => None,
            Self::Exhausted { errors } => Some(
                errors
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("#{}: {e}", i + 1))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Run `op` over `candidates` in order.
///
/// `op` receives the zero-based attempt index and the candidate. Errors for
/// which `is_retryable` returns false stop the run immediately.
pub async fn run_ordered<C, T, E, F, Fut, R>(
    candidates: impl IntoIterator<Item = C>,
    mut op: F,
    is_retryable: R,
) -> Result<T, FallbackError<E>>
where
    F: FnMut(usize, C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut errors = Vec::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        match op(index, candidate).await {
            Ok(value) => return Ok(value),
            Err(error) if is_retryable(&error) => errors.push(error),
            Err(error) => return Err(FallbackError::Fatal { index, error }),
        }
    }

    Err(FallbackError::Exhausted { errors })
}
