//! Square roots modulo a prime
//!
//! Branches on the residue of `p` modulo 4 and 8: closed forms for
//! `p ≡ 3 (mod 4)` and `p ≡ 5 (mod 8)`, and for `p ≡ 1 (mod 8)` an
//! exponentiation inside a quadratic extension picked by a witness search.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::trace;

use crate::error::{Error, Result};
use crate::modmath::{
    jacobi, mod_sub, polynomial_exponentiate_mod, powmod, residue, PolyElem, QuadraticModulus,
};

/// Returns some `r` with `r² ≡ a (mod p)`.
///
/// Requires `0 <= a < p` and `p > 1` prime. Fails with [`Error::NoSquareRoot`]
/// when `a` is a quadratic non-residue and with [`Error::FatalInvariant`] when
/// the arithmetic reveals that `p` is not prime. Every returned root is
/// checked by squaring it, so a composite modulus never yields a wrong answer.
pub fn sqrt_mod_prime(a: &BigUint, p: &BigUint) -> Result<BigUint> {
    if p <= &BigUint::one() {
        return Err(Error::Domain("p must be > 1".to_string()));
    }
    if a >= p {
        return Err(Error::Domain("a must be in [0, p)".to_string()));
    }

    if a.is_zero() {
        return Ok(BigUint::zero());
    }
    if p == &BigUint::from(2u8) {
        return Ok(a.clone());
    }

    if jacobi(a, p)? == -1 {
        return Err(Error::NoSquareRoot);
    }

    let root = if residue(p, 4) == 3 {
        powmod(a, &((p + 1u8) >> 2u32), p)
    } else if residue(p, 8) == 5 {
        sqrt_5_mod_8(a, p)?
    } else {
        sqrt_general(a, p)?
    };

    if (&root * &root) % p != *a {
        return Err(Error::FatalInvariant(format!(
            "candidate root does not square back to a, p = {p} is not prime"
        )));
    }
    Ok(root)
}

// Atkin's variant for p ≡ 5 (mod 8).
fn sqrt_5_mod_8(a: &BigUint, p: &BigUint) -> Result<BigUint> {
    let d = powmod(a, &((p - 1u8) >> 2u32), p);
    if d.is_one() {
        return Ok(powmod(a, &((p + 3u8) >> 3u32), p));
    }
    if d != p - 1u8 {
        return Err(Error::FatalInvariant(format!(
            "a^((p-1)/4) is neither 1 nor -1, p = {p} is not prime"
        )));
    }
    let four_a = (a << 2u32) % p;
    let t = powmod(&four_a, &((p - 5u8) >> 3u32), p);
    Ok(((a << 1u32) * t) % p)
}

// p ≡ 1 (mod 8): find i with i² - 4a a non-residue, so x² - i·x + a is
// irreducible, then x^((p+1)/2) is the root.
fn sqrt_general(a: &BigUint, p: &BigUint) -> Result<BigUint> {
    let four_a = (a << 2u32) % p;
    let exponent = (p + 1u8) >> 1u32;

    let mut i = BigUint::from(2u8);
    while &i < p {
        let discriminant = mod_sub(&(&i * &i), &four_a, p);
        if jacobi(&discriminant, p)? == -1 {
            trace!(witness = %i, "found quadratic non-residue witness");
            let modulus = QuadraticModulus::auxiliary(&i, a, p);
            let x: PolyElem = [BigUint::zero(), BigUint::one()];
            let [constant, linear] = polynomial_exponentiate_mod(&x, &exponent, &modulus, p)?;
            if !linear.is_zero() {
                return Err(Error::FatalInvariant(format!(
                    "non-zero linear term in x^((p+1)/2), p = {p} is not prime"
                )));
            }
            return Ok(constant);
        }
        i += 1u8;
    }

    Err(Error::NoSquareRoot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn assert_root(a: &BigUint, p: &BigUint) {
        let r = sqrt_mod_prime(a, p).unwrap();
        assert_eq!((&r * &r) % p, *a, "sqrt({a}) mod {p}");
    }

    #[test]
    fn test_trivial_cases() {
        assert_eq!(sqrt_mod_prime(&big(0), &big(13)).unwrap(), big(0));
        assert_eq!(sqrt_mod_prime(&big(1), &big(2)).unwrap(), big(1));
        assert_eq!(sqrt_mod_prime(&big(0), &big(2)).unwrap(), big(0));
    }

    #[test]
    fn test_preconditions() {
        assert!(matches!(sqrt_mod_prime(&big(13), &big(13)), Err(Error::Domain(_))));
        assert!(matches!(sqrt_mod_prime(&big(0), &big(1)), Err(Error::Domain(_))));
    }

    #[test]
    fn test_every_residue_for_small_primes() {
        // Covers all three branches: 3 mod 4, 5 mod 8 and 1 mod 8.
        for p in [3u64, 7, 11, 5, 13, 29, 37, 17, 41, 73, 89, 97, 113, 257] {
            let residues: std::collections::BTreeSet<u64> = (1..p).map(|k| k * k % p).collect();
            for a in residues {
                assert_root(&big(a), &big(p));
            }
        }
    }

    #[test]
    fn test_non_residues_fail() {
        for (a, p) in [(3u64, 7u64), (2, 5), (3, 17), (3, 41), (3, 257)] {
            assert!(
                matches!(sqrt_mod_prime(&big(a), &big(p)), Err(Error::NoSquareRoot)),
                "{a} should be a non-residue mod {p}"
            );
        }
    }

    #[test]
    fn test_general_case_large_primes() {
        // Goldilocks and the secp256k1 group order are both 1 mod 8.
        let goldilocks = big(0xffff_ffff_0000_0001);
        let order = BigUint::parse_bytes(
            b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
            16,
        )
        .unwrap();
        for p in [goldilocks, order] {
            assert_eq!(residue(&p, 8), 1);
            for k in [2u64, 3, 12345, 0xdead_beef] {
                let a = (big(k) * big(k)) % &p;
                assert_root(&a, &p);
            }
        }
    }

    #[test]
    fn test_5_mod_8_both_subcases() {
        // p = 2^255 - 19: 9 takes the d = 1 path, 4 and -1 take d = p - 1.
        let p = (BigUint::one() << 255u32) - 19u8;
        assert_root(&big(4), &p);
        assert_root(&(&p - 1u8), &p);
        assert_root(&big(9), &p);
    }

    #[test]
    fn test_composite_modulus_is_fatal() {
        // 65 = 5 * 13 and 105 = 3 * 5 * 7 are both 1 mod 8. For 65 the ring
        // exponentiation yields 8, which only the final squaring catches.
        for n in [65u64, 105] {
            assert!(
                matches!(sqrt_mod_prime(&big(4), &big(n)), Err(Error::FatalInvariant(_))),
                "modulus {n}"
            );
        }
    }

    #[test]
    fn test_composite_3_mod_4_is_fatal() {
        // 231 = 3 * 7 * 11; the closed form gives a wrong root for 4.
        assert!(matches!(
            sqrt_mod_prime(&big(4), &big(231)),
            Err(Error::FatalInvariant(_))
        ));
    }

    #[test]
    fn test_composite_5_mod_8_is_fatal() {
        // 21 = 3 * 7 ≡ 5 (mod 8); (4/21) = 1 but 4^5 mod 21 = 16.
        assert!(matches!(
            sqrt_mod_prime(&big(4), &big(21)),
            Err(Error::FatalInvariant(_))
        ));
    }
}
