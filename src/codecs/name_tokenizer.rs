//! Read name tokenizer (CRAM 3.1).
//!
//! Splits NUL-delimited read names into alphanumeric and separator tokens,
//! diffs each token column against a prior row, and sends every column to
//! its own entropy-coded byte stream.

mod decode;
mod encode;

pub use self::{decode::decode, encode::encode};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Type {
    Type,
    String,
    Char,
    Digits0,
    DZLen,
    Dup,
    Diff,
    Digits,
    Delta,
    Delta0,
    Match,
    Nop,
    End,
}

impl From<Type> for u8 {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Type => 0,
            Type::String => 1,
            Type::Char => 2,
            Type::Digits0 => 3,
            Type::DZLen => 4,
            Type::Dup => 5,
            Type::Diff => 6,
            Type::Digits => 7,
            Type::Delta => 8,
            Type::Delta0 => 9,
            Type::Match => 10,
            Type::Nop => 11,
            Type::End => 12,
        }
    }
}

impl TryFrom<u8> for Type {
    type Error = std::io::Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Self::Type),
            1 => Ok(Self::String),
            2 => Ok(Self::Char),
            3 => Ok(Self::Digits0),
            4 => Ok(Self::DZLen),
            5 => Ok(Self::Dup),
            6 => Ok(Self::Diff),
            7 => Ok(Self::Digits),
            8 => Ok(Self::Delta),
            9 => Ok(Self::Delta0),
            10 => Ok(Self::Match),
            11 => Ok(Self::Nop),
            12 => Ok(Self::End),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid token type: {n}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn t(src: &[u8]) -> io::Result<()> {
        let compressed = encode(src)?;
        let uncompressed = decode(&compressed)?;
        assert_eq!(uncompressed, src);
        Ok(())
    }

    #[test]
    fn test_self() -> io::Result<()> {
        t(b"I17_08765:2:123:61541:01763#9\x00I17_08765:2:123:1636:08611#9\x00I17_08765:2:124:45613:16161#9\x00")?;
        Ok(())
    }

    #[test]
    fn test_self_with_sequential_names() -> io::Result<()> {
        let src: Vec<u8> = (1..=100)
            .flat_map(|n| format!("read.{n}\x00").into_bytes())
            .collect();
        t(&src)?;
        Ok(())
    }

    #[test]
    fn test_self_with_padded_digits() -> io::Result<()> {
        let src: Vec<u8> = (1..=50)
            .flat_map(|n| format!("r{n:04}\x00").into_bytes())
            .collect();
        t(&src)?;
        Ok(())
    }

    #[test]
    fn test_self_with_duplicate_names() -> io::Result<()> {
        t(b"r001\x00r001\x00r002\x00r001\x00")?;
        Ok(())
    }

    #[test]
    fn test_self_with_mixed_width_numbers() -> io::Result<()> {
        // crossing a width boundary must preserve zero padding exactly
        t(b"s098\x00s099\x00s100\x00s0101\x00s101\x00")?;
        Ok(())
    }

    #[test]
    fn test_self_with_single_name() -> io::Result<()> {
        t(b"HWI-ST1133:217:D1D6DACXX:8:1108:14640:59477\x00")?;
        Ok(())
    }
}
