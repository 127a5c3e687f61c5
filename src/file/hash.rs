//! Content hashing.

use std::io::{self, Read, Seek};

use sha2::{Digest, Sha256};

use crate::{Result, SmdError};

/// A seekable upload body.
pub trait ByteSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ByteSource for T {}

/// Digest of an upload plus the number of bytes hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    /// Lowercase hex SHA-256.
    pub hex: String,
    pub size: u64,
}

/// Hash `source` from its start, reading at most `max` bytes.
///
/// The source is rewound before and after hashing. Bodies longer than `max`
/// fail with `PayloadTooLarge` before any digest is produced.
pub fn hash_source<R: Read + Seek + ?Sized>(source: &mut R, max: u64) -> Result<ContentDigest> {
    source.rewind().map_err(SmdError::Hash)?;

    let mut hasher = Sha256::new();
    let size = io::copy(&mut (&mut *source).take(max.saturating_add(1)), &mut hasher)
        .map_err(SmdError::Hash)?;
    if size > max {
        return Err(SmdError::PayloadTooLarge { size, max });
    }

    source.rewind().map_err(SmdError::Hash)?;

    Ok(ContentDigest {
        hex: format!("{:x}", hasher.finalize()),
        size,
    })
}

/// Hex SHA-256 of an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, SeekFrom};

    const TEST_DATA_SHA256: &str =
        "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9";

    #[test]
    fn test_known_digest() {
        let mut source = Cursor::new(b"test data".to_vec());
        let digest = hash_source(&mut source, 1024).unwrap();
        assert_eq!(digest.hex, TEST_DATA_SHA256);
        assert_eq!(digest.size, 9);
        assert_eq!(hash_bytes(b"test data"), TEST_DATA_SHA256);
    }

    #[test]
    fn test_rewinds_before_and_after() {
        let mut source = Cursor::new(b"test data".to_vec());
        source.seek(SeekFrom::Start(5)).unwrap();

        let digest = hash_source(&mut source, 1024).unwrap();

        assert_eq!(digest.hex, TEST_DATA_SHA256);
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_one_byte_difference() {
        assert_ne!(hash_bytes(b"test data"), hash_bytes(b"test datb"));
    }

    #[test]
    fn test_empty_source() {
        let mut source = Cursor::new(Vec::new());
        let digest = hash_source(&mut source, 0).unwrap();
        assert_eq!(
            digest.hex,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.size, 0);
    }

    #[test]
    fn test_over_limit() {
        let mut source = Cursor::new(b"test data".to_vec());
        let result = hash_source(&mut source, 8);
        assert!(matches!(
            result,
            Err(SmdError::PayloadTooLarge { size: 9, max: 8 })
        ));
    }

    #[test]
    fn test_exact_limit() {
        let mut source = Cursor::new(b"test data".to_vec());
        assert!(hash_source(&mut source, 9).is_ok());
    }

    struct Unreadable;

    impl Read for Unreadable {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    impl Seek for Unreadable {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_read_failure_is_hash_error() {
        let result = hash_source(&mut Unreadable, 1024);
        assert!(matches!(result, Err(SmdError::Hash(_))));
    }
}
