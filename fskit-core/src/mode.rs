use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeParseError {
    #[error("mode string must be 10 characters ('-rwxr-x--x'), got {0}")]
    BadLength(usize),
    #[error("unrecognized permission character '{0}'")]
    BadChar(char),
}

/// A `chmod`-style permission set parsed from `ls -l` syntax: a leading
/// type marker followed by three `rwx` triples for owner, group and other.
/// Within a triple the characters may appear in any order; each one adds
/// its bit (`r`=4, `w`=2, `x`=1, `-`=0) to the octal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    bits: u32,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Self, ModeParseError> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 10 {
            return Err(ModeParseError::BadLength(chars.len()));
        }
        // The leading character is the file-type marker and carries no bits.
        let mut bits = 0u32;
        for (i, triple) in chars[1..].chunks(3).enumerate() {
            let mut digit = 0u32;
            for &ch in triple {
                digit += match ch {
                    '-' => 0,
                    'x' => 1,
                    'w' => 2,
                    'r' => 4,
                    other => return Err(ModeParseError::BadChar(other)),
                };
            }
            bits |= digit << (6 - 3 * i as u32);
        }
        Ok(Self { bits })
    }

    /// Numeric permission bits, suitable for `chmod`.
    pub const fn bits(self) -> u32 {
        self.bits
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self { bits: bits & 0o777 }
    }
}

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("-")?;
        for shift in [6u32, 3, 0] {
            let digit = (self.bits >> shift) & 0o7;
            f.write_str(if digit & 4 != 0 { "r" } else { "-" })?;
            f.write_str(if digit & 2 != 0 { "w" } else { "-" })?;
            f.write_str(if digit & 1 != 0 { "x" } else { "-" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Mode, ModeParseError};

    #[rstest]
    #[case("-rwxrwxrwx", 0o777)]
    #[case("-rwxr-x--x", 0o751)]
    #[case("----------", 0o000)]
    #[case("-rw-r--r--", 0o644)]
    #[case("drwxr-xr-x", 0o755)]
    fn test_parse(#[case] input: &str, #[case] bits: u32) {
        assert_eq!(Mode::parse(input).unwrap().bits(), bits);
    }

    #[test]
    fn test_order_within_triple_is_free() {
        // Each character contributes its bit regardless of position.
        assert_eq!(Mode::parse("-xwrrwx--x").unwrap().bits(), 0o771);
    }

    #[test]
    fn test_bad_length() {
        assert_eq!(Mode::parse("-rwx"), Err(ModeParseError::BadLength(4)));
        assert_eq!(
            Mode::parse("-rwxrwxrwxx"),
            Err(ModeParseError::BadLength(11))
        );
    }

    #[test]
    fn test_bad_char() {
        assert_eq!(
            Mode::parse("-rwxr-s--x"),
            Err(ModeParseError::BadChar('s'))
        );
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["-rwxr-x--x", "-rw-r--r--", "----------", "-rwxrwxrwx"] {
            assert_eq!(Mode::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_from_bits_masks() {
        assert_eq!(Mode::from_bits(0o40755).bits(), 0o755);
    }
}
