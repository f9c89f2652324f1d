//! Exact modular arithmetic over arbitrary-precision integers
//!
//! Everything here works on `BigUint` values and never wraps. The quadratic
//! extension helpers back the general case of the square root solver, where
//! an element of `F_p[x]/(x² + c1·x + c0)` is stored as two coefficients in
//! ascending powers of `x`.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{Error, Result};

/// Computes `base^exponent mod modulus`.
///
/// Uses a Montgomery ladder, so every exponent bit costs exactly one
/// multiplication and one squaring. An exponent of zero yields `1 mod modulus`.
///
/// # Panics
///
/// Panics if `modulus` is zero.
pub fn powmod(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    assert!(!modulus.is_zero(), "modulus must be non-zero");

    let mut r0 = BigUint::one() % modulus;
    let mut r1 = base % modulus;
    for i in (0..exponent.bits()).rev() {
        if exponent.bit(i) {
            r0 = (&r0 * &r1) % modulus;
            r1 = (&r1 * &r1) % modulus;
        } else {
            r1 = (&r0 * &r1) % modulus;
            r0 = (&r0 * &r0) % modulus;
        }
    }
    r0
}

/// `(a - b) mod p` for non-negative operands.
pub fn mod_sub(a: &BigUint, b: &BigUint, p: &BigUint) -> BigUint {
    let a = a % p;
    let b = b % p;
    if a >= b {
        a - b
    } else {
        p - b + a
    }
}

/// Multiplicative inverse of `a` modulo the prime `p` (Fermat).
pub fn mod_inverse(a: &BigUint, p: &BigUint) -> Result<BigUint> {
    if p < &BigUint::from(2u8) {
        return Err(Error::Domain("modulus must be > 1".to_string()));
    }
    if (a % p).is_zero() {
        return Err(Error::Domain("zero has no inverse".to_string()));
    }
    Ok(powmod(a, &(p - 2u8), p))
}

/// Small residue `n mod m`, for case analysis on the low bits of `n`.
pub(crate) fn residue(n: &BigUint, m: u32) -> u32 {
    (n % m).to_u32().unwrap_or_default()
}

/// Jacobi symbol `(a / n)` for odd `n > 2`.
///
/// Returns -1, 0 or 1.
pub fn jacobi(a: &BigUint, n: &BigUint) -> Result<i8> {
    if n < &BigUint::from(3u8) {
        return Err(Error::Domain("jacobi: n must be > 2".to_string()));
    }
    if n.is_even() {
        return Err(Error::Domain("jacobi: n must be odd".to_string()));
    }
    Ok(jacobi_odd(a % n, n))
}

// `a < n`, `n` odd.
fn jacobi_odd(a: BigUint, n: &BigUint) -> i8 {
    if a.is_zero() {
        return 0;
    }
    if a.is_one() {
        return 1;
    }

    let e = a.trailing_zeros().unwrap_or(0);
    let a1 = &a >> e;

    let n8 = residue(n, 8);
    let mut s: i8 = if e % 2 == 0 || n8 == 1 || n8 == 7 { 1 } else { -1 };

    if a1.is_one() {
        return s;
    }

    if residue(n, 4) == 3 && residue(&a1, 4) == 3 {
        s = -s;
    }

    s * jacobi_odd(n % &a1, &a1)
}

/// Element of the quadratic extension ring: `[c0, c1]` means `c0 + c1·x`.
pub type PolyElem = [BigUint; 2];

/// Monic quadratic `x² + c1·x + c0` over `F_p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadraticModulus {
    pub c0: BigUint,
    pub c1: BigUint,
}

impl QuadraticModulus {
    /// `x² - t·x + n`, with coefficients reduced modulo `p`.
    pub fn auxiliary(t: &BigUint, n: &BigUint, p: &BigUint) -> Self {
        Self {
            c0: n % p,
            c1: mod_sub(&BigUint::zero(), t, p),
        }
    }
}

/// Reduces a product `a0 + a1·x + a2·x²` by the modulus, using
/// `x² ≡ -c1·x - c0`.
pub fn polynomial_reduce_mod(
    product: [BigUint; 3],
    modulus: &QuadraticModulus,
    p: &BigUint,
) -> PolyElem {
    let [a0, a1, a2] = product;
    let r0 = mod_sub(&a0, &(&a2 * &modulus.c0), p);
    let r1 = mod_sub(&a1, &(&a2 * &modulus.c1), p);
    [r0, r1]
}

/// Multiplies two ring elements and reduces the result.
pub fn polynomial_multiply_mod(
    m1: &PolyElem,
    m2: &PolyElem,
    modulus: &QuadraticModulus,
    p: &BigUint,
) -> PolyElem {
    let c0 = (&m1[0] * &m2[0]) % p;
    let c1 = (&m1[0] * &m2[1] + &m1[1] * &m2[0]) % p;
    let c2 = (&m1[1] * &m2[1]) % p;
    polynomial_reduce_mod([c0, c1, c2], modulus, p)
}

/// Raises `base` to `exponent` in `F_p[x]/(modulus)`.
///
/// The exponent must be smaller than `p`.
pub fn polynomial_exponentiate_mod(
    base: &PolyElem,
    exponent: &BigUint,
    modulus: &QuadraticModulus,
    p: &BigUint,
) -> Result<PolyElem> {
    if exponent >= p {
        return Err(Error::Domain(
            "polynomial exponent must be smaller than p".to_string(),
        ));
    }

    let mut result: PolyElem = [BigUint::one() % p, BigUint::zero()];
    let mut square: PolyElem = [&base[0] % p, &base[1] % p];
    for i in 0..exponent.bits() {
        if exponent.bit(i) {
            result = polynomial_multiply_mod(&square, &result, modulus, p);
        }
        square = polynomial_multiply_mod(&square, &square, modulus, p);
    }
    Ok(result)
}
