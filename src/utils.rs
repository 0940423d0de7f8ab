//! Convenience methods for constructing grids in a way that echoes,
//! but does not exactly match, methods common in scripting languages.
use num_traits::Float;

/// Integer count as a float. Every `usize` is representable (possibly
/// rounded) in the primitive floats; anything else saturates.
#[inline]
pub(crate) fn count<T: Float>(n: usize) -> T {
    T::from(n).unwrap_or_else(T::infinity)
}

/// Generates evenly spaced values from start to stop,
/// including the endpoint.
pub fn linspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let dx: T = (stop - start) / count::<T>(n - 1);
            let mut out: Vec<T> = (0..n).map(|i| start + count::<T>(i) * dx).collect();
            // Pin the endpoint exactly
            out[n - 1] = stop;
            out
        }
    }
}

/// Generates values evenly spaced in log space from start to stop,
/// including the endpoint. Both ends must be positive.
pub fn logspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    let mut out: Vec<T> = linspace(start.ln(), stop.ln(), n)
        .into_iter()
        .map(T::exp)
        .collect();
    if let Some(last) = out.last_mut() {
        *last = stop;
    }
    out
}
