//! Curve families and public key point recovery
//!
//! secp256k1 keys arrive compressed, so the missing y is recovered from
//! `y² = x³ + 7` with the generic square root solver. ed25519 keys are RFC 8032
//! encodings of y plus the sign of x; x is recovered from
//! `x² = (y² - 1) / (d·y² + 1)`. Every recovered point is checked against its
//! curve equation before it is returned.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::crypto::{PublicKeyRef, SECP256K1_EVEN_PREFIX, SECP256K1_ODD_PREFIX};
use crate::error::{Error, Result};
use crate::modmath::{mod_inverse, mod_sub, powmod};
use crate::sqrt::sqrt_mod_prime;
use crate::types::hex_biguint;

/// Supported curve families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFamily {
    Secp256k1,
    Ed25519,
}

impl CurveFamily {
    /// Prime of the field the curve is defined over
    pub fn field_prime(&self) -> &'static BigUint {
        match self {
            Self::Secp256k1 => secp256k1_prime(),
            Self::Ed25519 => ed25519_prime(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(Self::Secp256k1),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(Error::Domain(format!("unknown curve family: {other}"))),
        }
    }
}

/// p = 2^256 - 2^32 - 977
pub fn secp256k1_prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| (BigUint::one() << 256u32) - (BigUint::one() << 32u32) - 977u32)
}

/// p = 2^255 - 19
pub fn ed25519_prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| (BigUint::one() << 255u32) - 19u32)
}

/// d = -121665 / 121666 mod p
pub fn ed25519_d() -> &'static BigUint {
    static D: OnceLock<BigUint> = OnceLock::new();
    D.get_or_init(|| {
        let p = ed25519_prime();
        let numerator = p - 121_665u32;
        let inverse = powmod(&BigUint::from(121_666u32), &(p - 2u32), p);
        (numerator * inverse) % p
    })
}

/// Affine point on one of the supported curves
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub curve: CurveFamily,
    #[serde(with = "hex_biguint")]
    pub x: BigUint,
    #[serde(with = "hex_biguint")]
    pub y: BigUint,
}

impl Point {
    /// Check the curve's defining equation; coordinates must be reduced.
    pub fn is_on_curve(&self) -> bool {
        let p = self.curve.field_prime();
        if &self.x >= p || &self.y >= p {
            return false;
        }

        let y2 = (&self.y * &self.y) % p;
        match self.curve {
            // y² = x³ + 7
            CurveFamily::Secp256k1 => {
                let rhs = (powmod(&self.x, &BigUint::from(3u8), p) + 7u8) % p;
                y2 == rhs
            }
            // -x² + y² = 1 + d·x²·y²
            CurveFamily::Ed25519 => {
                let x2 = (&self.x * &self.x) % p;
                let lhs = mod_sub(&y2, &x2, p);
                let rhs = (ed25519_d() * &x2 % p * &y2 + 1u8) % p;
                lhs == rhs
            }
        }
    }

    /// Re-encode the point the way the ledger carries it
    pub fn compress(&self) -> PublicKeyRef {
        match self.curve {
            CurveFamily::Secp256k1 => {
                let mut bytes = [0u8; 33];
                bytes[0] = if self.y.is_odd() {
                    SECP256K1_ODD_PREFIX
                } else {
                    SECP256K1_EVEN_PREFIX
                };
                let x = self.x.to_bytes_be();
                bytes[33 - x.len()..].copy_from_slice(&x);
                PublicKeyRef::Secp256k1Compressed(bytes)
            }
            CurveFamily::Ed25519 => {
                let mut bytes = [0u8; 32];
                let y = self.y.to_bytes_le();
                bytes[..y.len()].copy_from_slice(&y);
                if self.x.is_odd() {
                    bytes[31] |= 0x80;
                }
                PublicKeyRef::Ed25519Encoded(bytes)
            }
        }
    }
}

/// Recover the full point behind a ledger public key.
///
/// Fails with [`Error::PointNotOnCurve`] when the encoding does not describe a
/// point of its curve.
pub fn recover_point(key: &PublicKeyRef) -> Result<Point> {
    let point = match key {
        PublicKeyRef::Secp256k1Compressed(bytes) => recover_secp256k1(bytes)?,
        PublicKeyRef::Ed25519Encoded(bytes) => decode_ed25519(bytes)?,
    };

    if !point.is_on_curve() {
        return Err(Error::PointNotOnCurve(point.curve));
    }
    trace!(curve = %point.curve, "recovered public key point");
    Ok(point)
}

fn not_on_curve(curve: CurveFamily) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        Error::NoSquareRoot => Error::PointNotOnCurve(curve),
        other => other,
    }
}

fn recover_secp256k1(bytes: &[u8; 33]) -> Result<Point> {
    let curve = CurveFamily::Secp256k1;
    let p = secp256k1_prime();

    let x = BigUint::from_bytes_be(&bytes[1..]);
    if &x >= p {
        return Err(Error::PointNotOnCurve(curve));
    }

    let rhs = (powmod(&x, &BigUint::from(3u8), p) + 7u8) % p;
    let y0 = sqrt_mod_prime(&rhs, p).map_err(not_on_curve(curve))?;

    let want_odd = bytes[0] & 1 == 1;
    let y = if y0.is_odd() == want_odd {
        y0
    } else {
        (p - y0) % p
    };
    if y.is_odd() != want_odd {
        return Err(Error::PointNotOnCurve(curve));
    }

    Ok(Point { curve, x, y })
}

fn decode_ed25519(encoded: &[u8; 32]) -> Result<Point> {
    let curve = CurveFamily::Ed25519;
    let p = ed25519_prime();

    let mut y_bytes = *encoded;
    let x_odd = y_bytes[31] & 0x80 != 0;
    y_bytes[31] &= 0x7f;

    let y = BigUint::from_bytes_le(&y_bytes);
    if &y >= p {
        return Err(Error::PointNotOnCurve(curve));
    }

    let y2 = (&y * &y) % p;
    let u = mod_sub(&y2, &BigUint::one(), p);
    let v = (ed25519_d() * &y2 + 1u8) % p;
    let x2 = (u * mod_inverse(&v, p)?) % p;

    let mut x = sqrt_mod_prime(&x2, p).map_err(not_on_curve(curve))?;
    if x.is_zero() && x_odd {
        return Err(Error::PointNotOnCurve(curve));
    }
    if x.is_odd() != x_odd {
        x = p - x;
    }

    Ok(Point { curve, x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_int(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 16).unwrap()
    }

    fn dec_int(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 10).unwrap()
    }

    const GX: &str = "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";
    const GY: &str = "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";

    #[test]
    fn test_recover_generator() {
        let key = PublicKeyRef::from_hex(&format!("02{GX}")).unwrap();
        let point = recover_point(&key).unwrap();
        assert_eq!(point.curve, CurveFamily::Secp256k1);
        assert_eq!(point.x, hex_int(GX));
        assert_eq!(point.y, hex_int(GY));
    }

    #[test]
    fn test_recover_generator_odd_prefix() {
        let key = PublicKeyRef::from_hex(&format!("03{GX}")).unwrap();
        let point = recover_point(&key).unwrap();
        assert_eq!(point.y, secp256k1_prime() - hex_int(GY));
        assert!(point.y.is_odd());
    }

    #[test]
    fn test_recover_multiples_of_generator() {
        let cases = [
            (
                "C6047F9441ED7D6D3045406E95C07CD85C778E4B8CEF3CA7ABAC09B95C709EE5",
                "1AE168FEA63DC339A3C58419466CEAEEF7F632653266D0E1236431A950CFE52A",
            ),
            (
                "F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9",
                "388F7B0F632DE8140FE337E62A37F3566500A99934C2231B6CB9FD7584B8E672",
            ),
        ];
        for (x, y) in cases {
            let point = recover_point(&PublicKeyRef::from_hex(&format!("02{x}")).unwrap()).unwrap();
            assert_eq!(point.x, hex_int(x));
            assert_eq!(point.y, hex_int(y));
        }
    }

    #[test]
    fn test_x_without_y_is_rejected() {
        for x in [0u8, 5, 7] {
            let mut bytes = [0u8; 33];
            bytes[0] = 0x02;
            bytes[32] = x;
            let key = PublicKeyRef::from_bytes(&bytes).unwrap();
            assert!(matches!(
                recover_point(&key),
                Err(Error::PointNotOnCurve(CurveFamily::Secp256k1))
            ));
        }
    }

    #[test]
    fn test_x_beyond_field_is_rejected() {
        let mut bytes = [0xffu8; 33];
        bytes[0] = 0x03;
        let key = PublicKeyRef::from_bytes(&bytes).unwrap();
        assert!(matches!(
            recover_point(&key),
            Err(Error::PointNotOnCurve(CurveFamily::Secp256k1))
        ));
    }

    #[test]
    fn test_ed25519_d_constant() {
        assert_eq!(
            *ed25519_d(),
            dec_int("37095705934669439343138083508754565189542113879843219016388785533085940283555")
        );
    }

    #[test]
    fn test_decode_ed25519_basepoint() {
        let key = PublicKeyRef::from_hex(
            "ED5866666666666666666666666666666666666666666666666666666666666666",
        )
        .unwrap();
        let point = recover_point(&key).unwrap();
        assert_eq!(point.curve, CurveFamily::Ed25519);
        assert_eq!(
            point.x,
            dec_int("15112221349535400772501151409588531511454012693041857206046113283949847762202")
        );
        assert_eq!(
            point.y,
            dec_int("46316835694926478169428394003475163141307993866256225615783033603165251855960")
        );
    }

    #[test]
    fn test_decode_ledger_ed25519_key() {
        let key = PublicKeyRef::from_hex(
            "ED9434799226374926EDA3B54B1B461B4ABF7237962EAE18528FEA67595397FA32",
        )
        .unwrap();
        let point = recover_point(&key).unwrap();
        assert_eq!(
            point.x,
            dec_int("28976406445744500688743833574273226803884610296681604500279796493974064366408")
        );
        assert_eq!(
            point.y,
            dec_int("23058398606147396873690551488055502405883685909773138878470705874882145105044")
        );
    }

    #[test]
    fn test_ed25519_identity_and_negative_zero() {
        let mut encoded = [0u8; 32];
        encoded[0] = 1;
        let identity = recover_point(&PublicKeyRef::Ed25519Encoded(encoded)).unwrap();
        assert!(identity.x.is_zero());
        assert!(identity.y.is_one());

        encoded[31] = 0x80;
        assert!(matches!(
            recover_point(&PublicKeyRef::Ed25519Encoded(encoded)),
            Err(Error::PointNotOnCurve(CurveFamily::Ed25519))
        ));
    }

    #[test]
    fn test_ed25519_rejects_non_square_and_non_canonical() {
        // y = 2 has no matching x
        let mut encoded = [0u8; 32];
        encoded[0] = 2;
        assert!(matches!(
            recover_point(&PublicKeyRef::Ed25519Encoded(encoded)),
            Err(Error::PointNotOnCurve(CurveFamily::Ed25519))
        ));

        // y = 2^255 - 1 is not reduced
        let mut encoded = [0xffu8; 32];
        encoded[31] = 0x7f;
        assert!(matches!(
            recover_point(&PublicKeyRef::Ed25519Encoded(encoded)),
            Err(Error::PointNotOnCurve(CurveFamily::Ed25519))
        ));
    }

    #[test]
    fn test_compress_roundtrip() {
        for hex_key in [
            format!("02{GX}"),
            format!("03{GX}"),
            "ED5866666666666666666666666666666666666666666666666666666666666666".to_string(),
            "ED9434799226374926EDA3B54B1B461B4ABF7237962EAE18528FEA67595397FA32".to_string(),
        ] {
            let key = PublicKeyRef::from_hex(&hex_key).unwrap();
            assert_eq!(recover_point(&key).unwrap().compress(), key);
        }
    }

    #[test]
    fn test_point_off_curve_detected() {
        let point = Point {
            curve: CurveFamily::Secp256k1,
            x: hex_int(GX),
            y: hex_int(GY) + 1u8,
        };
        assert!(!point.is_on_curve());
    }

    #[test]
    fn test_curve_family_parse() {
        assert_eq!("SECP256K1".parse::<CurveFamily>().unwrap(), CurveFamily::Secp256k1);
        assert_eq!("ed25519".parse::<CurveFamily>().unwrap(), CurveFamily::Ed25519);
        assert!("p256".parse::<CurveFamily>().is_err());
    }
}
