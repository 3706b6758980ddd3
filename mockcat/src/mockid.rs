//! Packing of (row, file) pairs into 64-bit mock identifiers
//!
//! A mock id stores the row of an object inside its input file in the low
//! [`ENCODE_ROW_END`] bits and the index of that file in the input file set in
//! the next bits up to [`ENCODE_FILE_END`]. The top 12 bits are always zero, so
//! every valid id is a non-negative `i64`.
//!
//! ```
//! use mockcat::mockid::{decode_rownum_filenum, encode_rownum_filenum};
//!
//! let id = encode_rownum_filenum(7, 3).unwrap();
//! assert_eq!(id, (3 << 32) + 7);
//! assert_eq!(decode_rownum_filenum(id).unwrap(), (7, 3));
//! ```

use crate::error::{MockError, Result};

/// Number of low bits holding the row number
pub const ENCODE_ROW_END: u32 = 32;
/// Bit position one past the file number
pub const ENCODE_FILE_END: u32 = 52;

pub const ENCODE_ROW_MASK: u64 = (1 << ENCODE_ROW_END) - 1;
pub const ENCODE_ROW_MAX: u64 = ENCODE_ROW_MASK;
pub const ENCODE_FILE_MASK: u64 = (1 << ENCODE_FILE_END) - (1 << ENCODE_ROW_END);
pub const ENCODE_FILE_MAX: u64 = ENCODE_FILE_MASK >> ENCODE_ROW_END;

/// Encode one row and file number into a mock id
///
/// # Arguments
/// * `row` - Row in the input file, `0..=ENCODE_ROW_MAX`
/// * `file` - File number in the input file set, `0..=ENCODE_FILE_MAX`
///
/// # Returns
/// * `Result<i64>` - The packed id, or `EncodeOutOfRange` if either value
///   does not fit its field
pub fn encode_rownum_filenum(row: i64, file: i64) -> Result<i64> {
    let in_range = |v: i64, max: u64| v >= 0 && (v as u64) <= max;
    if !in_range(row, ENCODE_ROW_MAX) || !in_range(file, ENCODE_FILE_MAX) {
        return Err(MockError::EncodeOutOfRange { row, file });
    }
    Ok((((file as u64) << ENCODE_ROW_END) | row as u64) as i64)
}

/// Invert [`encode_rownum_filenum`], returning `(row, file)`
///
/// Negative ids and ids with any bit at or above [`ENCODE_FILE_END`] set are
/// rejected with `DecodeOutOfRange`.
pub fn decode_rownum_filenum(mockid: i64) -> Result<(i64, i64)> {
    if mockid < 0 || (mockid as u64) >> ENCODE_FILE_END != 0 {
        return Err(MockError::DecodeOutOfRange(mockid));
    }
    let bits = mockid as u64;
    let row = bits & ENCODE_ROW_MASK;
    let file = (bits & ENCODE_FILE_MASK) >> ENCODE_ROW_END;
    Ok((row as i64, file as i64))
}

/// Element-wise [`encode_rownum_filenum`] over parallel arrays
pub fn encode_many(rows: &[i64], files: &[i64]) -> Result<Vec<i64>> {
    if rows.len() != files.len() {
        return Err(MockError::LengthMismatch {
            what: "row and file arrays",
            expected: rows.len(),
            found: files.len(),
        });
    }
    rows.iter()
        .zip(files)
        .map(|(&r, &f)| encode_rownum_filenum(r, f))
        .collect()
}

/// Element-wise [`decode_rownum_filenum`], returning `(rows, files)`
pub fn decode_many(mockids: &[i64]) -> Result<(Vec<i64>, Vec<i64>)> {
    let mut rows = Vec::with_capacity(mockids.len());
    let mut files = Vec::with_capacity(mockids.len());
    for &id in mockids {
        let (r, f) = decode_rownum_filenum(id)?;
        rows.push(r);
        files.push(f);
    }
    Ok((rows, files))
}

/// File number of every position in a concatenation of per-file blocks
///
/// Position `i` belongs to file `k` when `cumsum[k-1] <= i < cumsum[k]`.
pub fn file_numbers(n_per_file: &[usize]) -> Vec<i64> {
    n_per_file
        .iter()
        .enumerate()
        .flat_map(|(k, &n)| std::iter::repeat(k as i64).take(n))
        .collect()
}

/// Compute mock ids from per-file row numbers and per-file counts
///
/// # Arguments
/// * `objid` - Row of each object within its file, in concatenation order
/// * `n_per_file` - Number of objects contributed by each file, same order
///
/// # Returns
/// * `Result<Vec<i64>>` - Mock ids, or `LengthMismatch` if the counts do not
///   add up to `objid.len()`
pub fn make_mockid(objid: &[i64], n_per_file: &[usize]) -> Result<Vec<i64>> {
    let total: usize = n_per_file.iter().sum();
    if total != objid.len() {
        return Err(MockError::LengthMismatch {
            what: "n_per_file total",
            expected: objid.len(),
            found: total,
        });
    }
    encode_many(objid, &file_numbers(n_per_file))
}
