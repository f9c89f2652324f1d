#![no_main]

use keyscan_core::{decode_address, encode_account_id, Address};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(account_id) = decode_address(s) {
        // Re-encoding a valid address reproduces its account id
        let address = encode_account_id(&account_id);
        assert_eq!(decode_address(address.as_str()).unwrap(), account_id);

        let parsed = Address::parse(s).unwrap();
        assert_eq!(parsed.account_id(), &account_id);
    }
});
