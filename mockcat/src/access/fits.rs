//! FITS binary table backend built on cfitsio
//!
//! Column names are matched case-insensitively against the first table
//! extension. Numeric columns are read as `f64`; anything that cfitsio refuses
//! to convert is retried as a string column.

use std::path::Path;

use fitsio::errors::Error as FitsError;
use fitsio::hdu::HduInfo;
use fitsio::FitsFile;
use log::debug;

use crate::access::CatalogAccess;
use crate::error::{MockError, Result};
use crate::table::{Column, ColumnTable, HeaderCards, HeaderValue};

/// cfitsio status for a move past the last HDU
const END_OF_FILE: i32 = 107;

/// [`CatalogAccess`] over FITS files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsAccess;

impl CatalogAccess for FitsAccess {
    fn read_table(&self, path: &Path, columns: &[&str]) -> Result<ColumnTable> {
        if !path.exists() {
            return Err(MockError::MissingSource(path.to_path_buf()));
        }
        let mut fptr = FitsFile::open(path)?;
        let hdu = fptr.hdu(1)?;

        let available: Vec<String> = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                ..
            } => column_descriptions.iter().map(|c| c.name.clone()).collect(),
            _ => {
                return Err(MockError::Unsupported(format!(
                    "HDU 1 of {} is not a table",
                    path.display()
                )))
            }
        };

        let mut table = ColumnTable::new();
        for &wanted in columns {
            let name = available
                .iter()
                .find(|n| n.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| MockError::MissingColumn {
                    column: wanted.to_string(),
                    table: path.display().to_string(),
                })?;

            let column = match hdu.read_col::<f64>(&mut fptr, name) {
                Ok(values) => Column::F64(values),
                Err(_) => Column::Str(hdu.read_col::<String>(&mut fptr, name)?),
            };
            table.insert(wanted, column)?;
        }

        debug!(
            "Read {} rows x {} columns from {}",
            table.nrows(),
            table.ncols(),
            path.display()
        );
        Ok(table)
    }

    fn read_extension_headers(&self, path: &Path, keys: &[&str]) -> Result<Vec<HeaderCards>> {
        if !path.exists() {
            return Err(MockError::MissingSource(path.to_path_buf()));
        }
        let mut fptr = FitsFile::open(path)?;
        let mut headers = Vec::new();

        // The primary HDU carries no per-object keywords
        let mut hdu_idx = 1;
        loop {
            let hdu = match fptr.hdu(hdu_idx) {
                Ok(hdu) => hdu,
                Err(FitsError::Fits(e)) if e.status == END_OF_FILE => break,
                Err(e) => return Err(e.into()),
            };
            let mut cards = HeaderCards::new();
            for &key in keys {
                let value = match hdu.read_key::<f64>(&mut fptr, key) {
                    Ok(v) => HeaderValue::Float(v),
                    Err(_) => match hdu.read_key::<String>(&mut fptr, key) {
                        Ok(s) => HeaderValue::Str(s),
                        Err(_) => {
                            return Err(MockError::MissingHeader {
                                key: key.to_string(),
                                hdu: hdu_idx,
                                path: path.to_path_buf(),
                            })
                        }
                    },
                };
                cards.insert(key, value);
            }
            headers.push(cards);
            hdu_idx += 1;
        }

        Ok(headers)
    }

    fn read_datasets(&self, path: &Path, _group: &str, _names: &[&str]) -> Result<ColumnTable> {
        Err(MockError::Unsupported(format!(
            "hierarchical datasets in {} cannot be read by the FITS backend",
            path.display()
        )))
    }
}
