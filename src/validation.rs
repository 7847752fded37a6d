//! Argument validators shared by the storage engine, the pool and the config loader.

use crate::error::{PoolError, PoolResult};
use std::ops::Range;
use std::path::Path;

/// Validates that a chunk size can produce non-empty chunks.
///
/// # Returns
///
/// * `Ok(())` if `chunk_size >= 1`.
/// * `Err(PoolError::InvalidConfiguration)` otherwise.
pub fn is_valid_chunk_size(chunk_size: usize) -> PoolResult<()> {
    if chunk_size > 0 {
        Ok(())
    } else {
        Err(PoolError::InvalidConfiguration(
            "chunk_size must be greater than 0".into(),
        ))
    }
}

/// Validates an overlap percentage, which must lie in `[0, 100)`.
pub fn is_valid_overlap(overlap_percent: f64) -> PoolResult<()> {
    is_in_range(overlap_percent, 0.0..100.0).map_err(|_| {
        PoolError::InvalidConfiguration(format!(
            "overlap must be in [0, 100), got {overlap_percent}"
        ))
    })
}

/// Computes the window step for an overlapped read.
///
/// `step = floor(chunk_size * (1 - overlap_percent / 100))`. A step of zero
/// would never advance, so it is rejected.
pub fn overlap_step(chunk_size: usize, overlap_percent: f64) -> PoolResult<usize> {
    is_valid_chunk_size(chunk_size)?;
    is_valid_overlap(overlap_percent)?;
    let step = (chunk_size as f64 * (100.0 - overlap_percent) / 100.0).floor() as usize;
    if step == 0 {
        return Err(PoolError::InvalidConfiguration(format!(
            "chunk_size {chunk_size} with {overlap_percent}% overlap gives a step of 0"
        )));
    }
    Ok(step)
}

/// Validates that a folder for file-backed storage exists and is a directory.
pub fn is_valid_folder(folder: &Path) -> PoolResult<()> {
    if folder.as_os_str().is_empty() {
        return Err(PoolError::InvalidConfiguration(
            "storage folder cannot be empty".into(),
        ));
    }
    if !folder.is_dir() {
        return Err(PoolError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("storage folder '{}' does not exist", folder.display()),
        )));
    }
    Ok(())
}

/// Validates that a given value is within a half-open range.
///
/// NaN is never in range.
pub fn is_in_range<T: PartialOrd>(value: T, range: Range<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty.
pub fn is_not_empty(value: &str, what: &str) -> PoolResult<()> {
    if value.trim().is_empty() {
        Err(PoolError::InvalidConfiguration(format!("{what} cannot be empty")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_for_half_overlap() {
        assert_eq!(overlap_step(50, 50.0).unwrap(), 25);
        assert_eq!(overlap_step(100, 10.0).unwrap(), 90);
        assert_eq!(overlap_step(7, 0.0).unwrap(), 7);
    }

    #[test]
    fn full_or_excessive_overlap_rejected() {
        assert!(overlap_step(50, 100.0).is_err());
        assert!(overlap_step(50, -1.0).is_err());
        assert!(overlap_step(50, f64::NAN).is_err());
        // floor(1 * 0.5) == 0
        assert!(overlap_step(1, 50.0).is_err());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(is_valid_chunk_size(0).is_err());
        assert!(overlap_step(0, 10.0).is_err());
    }

    #[test]
    fn missing_folder_is_io_error() {
        let err = is_valid_folder(Path::new("/no/such/folder/for/signal_pool")).unwrap_err();
        assert!(matches!(err, PoolError::Io(_)));
    }

    #[test]
    fn blank_names_rejected() {
        assert!(is_not_empty("  ", "source_id").is_err());
        assert!(is_not_empty("source_1", "source_id").is_ok());
    }
}
