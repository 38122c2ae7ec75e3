//! Utility functions for timestamps and version hashes.

mod hashing;
pub mod timestamps;

pub use hashing::version_hash;
pub use timestamps::{format_iso, iso_timestamp, now_utc, parse_iso, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(parse_iso(&ts).is_some());
    }
}
