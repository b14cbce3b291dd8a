//! Test helpers shared by the `netbios-rs` crates.
//!
//! Wire values are written as hex strings; whitespace inside them is ignored,
//! so long packets may be split by field.

#[doc(hidden)]
pub use binrw;
#[doc(hidden)]
pub use pastey;

/// Decodes a hex string (whitespace ignored) into bytes.
///
/// Panics on malformed input, which is what a test wants.
pub fn decode_hex(hex: &str) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    assert!(digits.len() % 2 == 0, "odd number of hex digits");
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).expect("hex digits are ascii");
            u8::from_str_radix(pair, 16).expect("invalid hex digit")
        })
        .collect()
}

/// Converts a hex string literal into a `Vec<u8>`.
#[macro_export]
macro_rules! hex_to_u8_array {
    ($hex:expr) => {
        $crate::decode_hex($hex)
    };
}

/// Generates a test that reads `$hex` as `$type` (big-endian unless the type
/// declares otherwise) and compares it to `$value`.
#[macro_export]
macro_rules! test_binrw_read {
    ($type:ident : $value:expr => $hex:expr) => {
        $crate::test_binrw_read! { $type => $type : $value => $hex }
    };
    ($type:ty => $name:ident : $value:expr => $hex:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _read>]() {
                use $crate::binrw::{BinReaderExt, io::Cursor};
                let mut cursor = Cursor::new($crate::hex_to_u8_array! { $hex });
                let value: $type = cursor.read_be().unwrap();
                assert_eq!(value, $value);
            }
        }
    };
}

/// Generates a test that writes `$value` as `$type` and compares the output to `$hex`.
#[macro_export]
macro_rules! test_binrw_write {
    ($type:ident : $value:expr => $hex:expr) => {
        $crate::test_binrw_write! { $type => $type : $value => $hex }
    };
    ($type:ty => $name:ident : $value:expr => $hex:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _write>]() {
                use $crate::binrw::{BinWriterExt, io::Cursor};
                let value: $type = $value;
                let mut cursor = Cursor::new(Vec::new());
                cursor.write_be(&value).unwrap();
                assert_eq!(cursor.into_inner(), $crate::hex_to_u8_array! { $hex });
            }
        }
    };
}

/// Generates both read and write tests for the same value.
#[macro_export]
macro_rules! test_binrw {
    ($($v:tt)+) => {
        $crate::test_binrw_read! { $($v)+ }
        $crate::test_binrw_write! { $($v)+ }
    };
}
