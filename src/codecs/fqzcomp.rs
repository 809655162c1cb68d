//! fqzcomp quality-score codec (CRAM 3.1).
//!
//! A context-mixing coder specialized for DNA quality strings: each symbol's
//! context mixes recent quality history, position in read, a running delta,
//! and an optional per-read selector, all described by a stored parameter
//! block.

mod decode;
mod encode;
mod models;
mod parameters;

use self::models::Models;
pub use self::{decode::decode, encode::encode};

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_self() -> io::Result<()> {
        fn t(data: &[Vec<u8>]) -> io::Result<()> {
            let records: Vec<_> = data.iter().map(|scores| (scores.len(), false)).collect();
            let src: Vec<_> = data.iter().flatten().copied().collect();

            let compressed_data = encode(&records, &src)?;
            let uncompressed_data = decode(&compressed_data)?;

            assert_eq!(uncompressed_data, src);

            Ok(())
        }

        t(&[
            vec![0, 0, 0, 1, 1, 2, 1, 1, 0, 0],
            vec![0, 1, 2, 3, 3, 3, 3, 3, 3, 3],
            vec![2, 1, 1, 0, 0],
        ])?;

        t(&[
            vec![0, 0, 0, 1, 1, 2, 1, 1, 0, 0],
            vec![0, 1, 2, 3, 3, 3, 3, 3, 3, 3],
            vec![2, 1, 1, 0, 0, 0, 0, 0, 1, 1],
        ])?;

        // quality map: 3 distinct values
        t(&[
            vec![5, 10, 15, 5, 10, 15, 5, 10, 15, 5],
            vec![10, 15, 5, 10, 15, 5, 10, 15, 5, 10],
            vec![15, 5, 10, 15, 5],
        ])?;

        // quality map: single value
        t(&[vec![42, 42, 42, 42, 42], vec![42, 42, 42, 42, 42]])?;

        // no quality map: 17 distinct values
        t(&[
            (0u8..17).collect(),
            (0u8..17).collect(),
            (0u8..17).collect(),
        ])?;

        Ok(())
    }

    #[test]
    fn test_self_with_duplicates() -> io::Result<()> {
        // > 5% duplicate records enables dedup
        let mut data = vec![vec![1, 1, 2, 2, 3, 3, 4, 4]; 18];
        data.push(vec![4, 3, 2, 1, 1, 2, 3, 4]);
        data.push(vec![1, 1, 2, 2, 3, 3, 4, 4]);

        let records: Vec<_> = data.iter().map(|scores| (scores.len(), false)).collect();
        let src: Vec<_> = data.iter().flatten().copied().collect();

        let compressed_data = encode(&records, &src)?;
        let uncompressed_data = decode(&compressed_data)?;

        assert_eq!(uncompressed_data, src);

        Ok(())
    }

    #[test]
    fn test_self_multi_param() -> io::Result<()> {
        // 15 short + 15 long reads trigger multiple parameter blocks
        let mut data: Vec<Vec<u8>> = Vec::new();
        for i in 0..15 {
            data.push(vec![(i % 4) as u8; 5]);
        }
        for i in 0..15 {
            data.push(vec![(i % 6) as u8; 20]);
        }

        let records: Vec<_> = data.iter().map(|scores| (scores.len(), false)).collect();
        let src: Vec<_> = data.iter().flatten().copied().collect();

        let compressed_data = encode(&records, &src)?;
        let uncompressed_data = decode(&compressed_data)?;

        assert_eq!(uncompressed_data, src);

        Ok(())
    }

    #[test]
    fn test_self_multi_param_with_reverse() -> io::Result<()> {
        let mut data: Vec<Vec<u8>> = Vec::new();
        let mut records = Vec::new();
        for i in 0..15 {
            data.push((0..5).map(|j| ((i * 3 + j) % 10) as u8).collect());
            records.push((5, i % 3 == 1));
        }
        for i in 0..15 {
            data.push((0..20).map(|j| ((i * 7 + j) % 12) as u8).collect());
            records.push((20, i % 4 == 0));
        }

        let src: Vec<_> = data.iter().flatten().copied().collect();

        let compressed_data = encode(&records, &src)?;
        let uncompressed_data = decode(&compressed_data)?;

        assert_eq!(uncompressed_data, src);

        Ok(())
    }
}
