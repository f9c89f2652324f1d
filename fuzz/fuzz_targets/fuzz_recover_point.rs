#![no_main]

use keyscan_core::{recover_point, Error, PublicKeyRef};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(key) = PublicKeyRef::from_bytes(data) else {
        return;
    };

    match recover_point(&key) {
        Ok(point) => {
            assert!(point.is_on_curve());
            assert_eq!(point.compress(), key);
        }
        Err(Error::PointNotOnCurve(curve)) => assert_eq!(curve, key.curve()),
        Err(e) => panic!("unexpected error: {e}"),
    }
});
