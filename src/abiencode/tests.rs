
use super::*;
use alloc::vec::Vec;
use serde::Serialize;
use uint::hex::FromHex;

use core::fmt::Debug;

/*
Python code to split output from remix or ethers into chunks of 32 bytes, the
annotations are done manually.
```python
s = "..."
print(*(s[i:i+64] for i in range(0, len(s), 64)), sep="\n")
```
*/

struct AssertWriter<'a, I>
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    expected_iter: I,
}

struct Slot<'a>(&'a [u8]);

impl<'a> Debug for Slot<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.0 {
            f.write_fmt(format_args!("{:02x}", b))?;
        }
        Ok(())
    }
}

impl<'a> PartialEq for Slot<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'a, I> Writer for AssertWriter<'a, I>
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    fn write(&mut self, slot: &[u8]) {
        match self.expected_iter.next() {
            Some((expected, _line)) => {
                assert_eq!(slot.len(), 32, "Each slot should have 32 bytes.");

                #[cfg(feature = "std")]
                println!("{}", _line);

                assert_eq!(
                    Slot(slot),
                    Slot(parse_slot(expected).as_slice()),
                    "slot did not match the expected value"
                );
            }
            None => {
                panic!("Expected end of data, got {:?}", Slot(slot));
            }
        }
    }
}

fn parse_slot(expected: &str) -> [u8; 32] {
    assert_eq!(
        expected.len(),
        64,
        "The expected input must be grouped into slots of 32 bytes as hex, without 0x."
    );
    <[u8; 32]>::from_hex(expected).unwrap()
}

macro_rules! expected_iter {
    ( $expected:expr ) => {
        // 32-byte hex string at the beginning of every non-empty line, anything
        // after it is a comment explaining the slot.
        $expected
            .split("\n")
            .filter(|&line| !line.trim().is_empty())
            .map(|line| {
                if line.trim().len() < 64 {
                    panic!("expected line is too short, it must start with a 32 byte hex string!");
                };
                (
                    &line.trim()[..64], // Data to compare
                    line,               // Line to display
                )
            })
    };
}

/// Slots of an annotated expectation as one buffer, for feeding the decoder.
pub fn expected_bytes(expected: &str) -> Vec<u8> {
    expected_iter!(expected)
        .flat_map(|(slot, _)| parse_slot(slot))
        .collect()
}

pub fn serialize_and_compare_fnargs<T>(value: &T, expected: &str)
where
    T: Serialize,
{
    let mut writer = AssertWriter {
        expected_iter: expected_iter!(expected),
    };
    ser::to_fnargs_writer(&value, &mut writer).unwrap();

    // Make sure we're not missing a slot.
    let next = writer.expected_iter.next();
    assert_eq!(next, None, "there are less slots than expected.");
}

pub fn serialize_and_compare<T>(value: &T, expected: &str)
where
    T: Serialize,
{
    let mut writer = AssertWriter {
        expected_iter: expected_iter!(expected),
    };
    to_writer(&value, &mut writer).unwrap();

    // Make sure we're not missing a slot.
    let next = writer.expected_iter.next();
    assert_eq!(next, None, "there are less slots than expected.");
}

/// Check both directions: `value` encodes to `expected` and `expected` decodes
/// back to `value`.
pub fn roundtrip_and_compare<T>(value: &T, expected: &str)
where
    T: Serialize + Decode + PartialEq + Debug,
{
    serialize_and_compare(value, expected);
    let decoded: T = from_slice(&expected_bytes(expected)).unwrap();
    assert_eq!(&decoded, value);
}
