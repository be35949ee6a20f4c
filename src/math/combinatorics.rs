//! Binomial coefficients and factorials for the filter recursions.
//!
//! Both are evaluated in `f64`. Filter orders stay small (the default is 5),
//! so `n!` remains exact up to `n = 18` and far from overflow.

/// `n!` as a float.
pub fn factorial(n: usize) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Binomial coefficient `C(n, k)`; zero when `k > n`.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    // Multiplicative form over the shorter side keeps intermediates small.
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result *= (n - i) as f64;
        result /= (i + 1) as f64;
    }
    result
}
