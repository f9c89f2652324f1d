//! Property-based tests for keyscan-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use keyscan_core::{
    account_id, decode_address, encode_address, modmath::jacobi, recover_point, sqrt_mod_prime,
    CurveFamily, Error, PublicKeyRef,
};
use num_bigint::BigUint;
use proptest::prelude::*;

const SMALL_PRIMES: &[u64] = &[3, 5, 7, 11, 13, 17, 29, 37, 41, 73, 89, 97, 113, 257, 65537];

fn big_primes() -> Vec<BigUint> {
    [
        // secp256k1 field, p ≡ 3 (mod 4)
        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
        // ed25519 field, p ≡ 5 (mod 8)
        "7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFED",
        // Goldilocks, p ≡ 1 (mod 8)
        "FFFFFFFF00000001",
        // secp256k1 group order, p ≡ 1 (mod 8)
        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
        // BN254 scalar field, p ≡ 1 (mod 8)
        "30644E72E131A029B85045B68181585D2833E84879B9709143E1F593F0000001",
    ]
    .iter()
    .map(|h| BigUint::parse_bytes(h.as_bytes(), 16).unwrap())
    .collect()
}

// ============================================
// Arbitrary Implementations
// ============================================

fn arb_ledger_key() -> impl Strategy<Value = [u8; 33]> {
    (prop_oneof![Just(0x02u8), Just(0x03u8), Just(0xEDu8)], any::<[u8; 32]>()).prop_map(
        |(prefix, body)| {
            let mut bytes = [0u8; 33];
            bytes[0] = prefix;
            bytes[1..].copy_from_slice(&body);
            bytes
        },
    )
}

fn arb_secret_key() -> impl Strategy<Value = k256::SecretKey> {
    any::<[u8; 32]>().prop_filter_map("scalar out of range", |bytes| {
        k256::SecretKey::from_slice(&bytes).ok()
    })
}

// ============================================
// Property Tests
// ============================================

proptest! {
    // ----------------------------------------
    // Square Root Properties
    // ----------------------------------------

    #[test]
    fn sqrt_of_square_small_primes(idx in 0..SMALL_PRIMES.len(), r in any::<u64>()) {
        let p = BigUint::from(SMALL_PRIMES[idx]);
        let root = BigUint::from(r) % &p;
        let a = (&root * &root) % &p;

        let found = sqrt_mod_prime(&a, &p).unwrap();
        prop_assert_eq!((&found * &found) % &p, a);
    }

    #[test]
    fn non_residues_have_no_root(idx in 0..SMALL_PRIMES.len(), a in 1u64..65537) {
        let p = BigUint::from(SMALL_PRIMES[idx]);
        let a = BigUint::from(a) % &p;
        prop_assume!(a != BigUint::from(0u8));
        prop_assume!(jacobi(&a, &p).unwrap() == -1);

        prop_assert!(matches!(sqrt_mod_prime(&a, &p), Err(Error::NoSquareRoot)));
    }

    // ----------------------------------------
    // Address Codec Properties
    // ----------------------------------------

    #[test]
    fn address_decodes_to_account_id(key in arb_ledger_key()) {
        let address = encode_address(&key).unwrap();
        prop_assert!(address.as_str().starts_with('r'));
        prop_assert_eq!(decode_address(address.as_str()).unwrap(), account_id(&key).unwrap());
        prop_assert_eq!(encode_address(&key).unwrap(), address);
    }

    #[test]
    fn address_changes_under_bit_flip(key in arb_ledger_key(), bit in 0usize..264) {
        let mut flipped = key;
        flipped[bit / 8] ^= 1 << (bit % 8);
        prop_assert_ne!(encode_address(&key).unwrap(), encode_address(&flipped).unwrap());
    }

    #[test]
    fn address_rejects_single_char_change(key in arb_ledger_key(), pos in 1usize..25) {
        let address = encode_address(&key).unwrap().to_string();
        let mut chars: Vec<char> = address.chars().collect();
        let pos = pos.min(chars.len() - 1);
        chars[pos] = if chars[pos] == 'r' { 'p' } else { 'r' };
        let tampered: String = chars.into_iter().collect();

        prop_assert!(decode_address(&tampered).is_err());
    }

    // ----------------------------------------
    // Point Recovery Properties
    // ----------------------------------------

    #[test]
    fn recovered_points_satisfy_curve(key in arb_ledger_key()) {
        let key = PublicKeyRef::from_bytes(&key).unwrap();
        match recover_point(&key) {
            Ok(point) => {
                prop_assert!(point.is_on_curve());
                prop_assert_eq!(point.curve, key.curve());
                prop_assert_eq!(point.compress(), key);
            }
            Err(e) => prop_assert!(matches!(e, Error::PointNotOnCurve(_))),
        }
    }

    #[test]
    fn secp256k1_recovery_matches_k256(secret in arb_secret_key()) {
        let public = secret.public_key();
        let compressed = public.to_encoded_point(true);
        let uncompressed = public.to_encoded_point(false);

        let key = PublicKeyRef::from_bytes(compressed.as_bytes()).unwrap();
        let point = recover_point(&key).unwrap();

        let full = uncompressed.as_bytes();
        prop_assert_eq!(point.curve, CurveFamily::Secp256k1);
        prop_assert_eq!(point.x, BigUint::from_bytes_be(&full[1..33]));
        prop_assert_eq!(point.y.clone(), BigUint::from_bytes_be(&full[33..65]));

        // 0x02 means even y, 0x03 odd y
        prop_assert_eq!(point.y.bit(0), compressed.as_bytes()[0] == 0x03);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sqrt_of_square_large_primes(idx in 0usize..5, r in any::<[u8; 32]>()) {
        let p = &big_primes()[idx];
        let root = BigUint::from_bytes_be(&r) % p;
        let a = (&root * &root) % p;

        let found = sqrt_mod_prime(&a, p).unwrap();
        prop_assert_eq!((&found * &found) % p, a);
    }

    #[test]
    fn non_residues_have_no_root_large_primes(idx in 0usize..5, x in any::<[u8; 32]>()) {
        let p = &big_primes()[idx];
        let x = BigUint::from_bytes_be(&x) % p;
        prop_assume!(x != BigUint::from(0u8));

        // A non-residue times a non-zero square stays a non-residue
        let a = (least_non_residue(p) * &x * &x) % p;
        prop_assert_eq!(jacobi(&a, p).unwrap(), -1);
        prop_assert!(matches!(sqrt_mod_prime(&a, p), Err(Error::NoSquareRoot)));
    }
}

fn least_non_residue(p: &BigUint) -> BigUint {
    (2u32..)
        .map(BigUint::from)
        .find(|n| jacobi(n, p).unwrap() == -1)
        .unwrap()
}

#[test]
fn general_branch_rejects_non_residues() {
    let eight = BigUint::from(8u8);
    let one = BigUint::from(1u8);

    // secp256k1 group order and BN254 scalar field
    for p in &big_primes()[3..] {
        assert_eq!(p % &eight, one);

        let n = least_non_residue(p);
        for k in 1u32..=16 {
            let a = (&n * BigUint::from(k) * BigUint::from(k)) % p;
            assert!(matches!(sqrt_mod_prime(&a, p), Err(Error::NoSquareRoot)));

            let square = (BigUint::from(k) * BigUint::from(k)) % p;
            let root = sqrt_mod_prime(&square, p).unwrap();
            assert_eq!((&root * &root) % p, square);
        }
    }
}

#[test]
fn frost_ed25519_keys_recover() {
    let mut rng = rand::thread_rng();

    for _ in 0..8 {
        let (_, pubkey_package) = frost_ed25519::keys::generate_with_dealer(
            2,
            2,
            frost_ed25519::keys::IdentifierList::Default,
            &mut rng,
        )
        .unwrap();
        let encoded = pubkey_package.verifying_key().serialize().unwrap();
        assert_eq!(encoded.len(), 32);

        let mut ledger_key = vec![0xED];
        ledger_key.extend_from_slice(&encoded);
        let key = PublicKeyRef::from_bytes(&ledger_key).unwrap();

        let point = recover_point(&key).unwrap();
        assert_eq!(point.curve, CurveFamily::Ed25519);
        assert!(point.is_on_curve());
        assert_eq!(point.compress(), key);
        assert!(decode_address(key.address().as_str()).is_ok());
    }
}
