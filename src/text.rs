//! Reading and writing spectra and feature tables as delimited text.
use std::fs;
use std::io::{self, prelude::*};
use std::path;

use thiserror::Error;

use crate::feature::{Feature, FeatureTable, MatchResult};
use crate::spectrum::{Spectrum, SpectrumError};

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_SKIP_ROWS: usize = 8;
pub const DEFAULT_MZ_COLUMN: &str = "m/z";
pub const DEFAULT_NAME_COLUMN: &str = "Name";

/// The columns appended to the feature table by [`FeatureTableWriter`], in order
pub const RESULT_COLUMNS: [&str; 9] = [
    "matched_spectrum_mz",
    "matched_spectrum_intensity",
    "ppm_error",
    "left_boundary_mz",
    "right_boundary_mz",
    "left_boundary_intensity",
    "right_boundary_intensity",
    "peak_width_da",
    "peak_width_ppm",
];

#[derive(Debug, Error)]
pub enum TextError {
    #[error("An I/O error occurred: {0}")]
    Io(#[from] io::Error),
    #[error("A delimited text error occurred: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column {column:?} not found, available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("Could not parse {value:?} as a number on line {line}")]
    InvalidNumber { line: u64, value: String },
    #[error("Expected two columns on line {0}")]
    MissingValue(u64),
    #[error("The spectrum read was invalid: {0}")]
    InvalidSpectrum(#[from] SpectrumError),
}

fn parse_number<T: std::str::FromStr>(value: &str, line: u64) -> Result<T, TextError> {
    value.trim().parse().map_err(|_| TextError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

/// Read whitespace separated m/z and intensity pairs, one per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn arrays_from_reader<R: BufRead>(reader: R) -> Result<(Vec<f64>, Vec<f32>), TextError> {
    let mut mz_array = Vec::new();
    let mut intensity_array = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = i as u64 + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (mz, intensity) = match (tokens.next(), tokens.next()) {
            (Some(mz), Some(intensity)) => (mz, intensity),
            _ => return Err(TextError::MissingValue(lineno)),
        };
        mz_array.push(parse_number(mz, lineno)?);
        intensity_array.push(parse_number(intensity, lineno)?);
    }
    Ok((mz_array, intensity_array))
}

pub fn read_spectrum<P: AsRef<path::Path>>(path: P) -> Result<Spectrum<'static>, TextError> {
    let reader = io::BufReader::new(fs::File::open(path)?);
    let (mz_array, intensity_array) = arrays_from_reader(reader)?;
    Ok(Spectrum::new(mz_array, intensity_array)?)
}

pub fn write_spectrum<W: Write>(spectrum: &Spectrum<'_>, writer: W) -> io::Result<()> {
    let mut writer = io::BufWriter::new(writer);
    for (mz, intensity) in spectrum.iter() {
        writeln!(writer, "{}\t{}", mz, intensity)?;
    }
    writer.flush()
}

/// Reads [`Feature`]s from a delimited table with some leading preamble lines.
///
/// The m/z column is required. When the name column is absent or a name cell is
/// empty, the m/z text is used as the name. Every other column is carried along
/// in [`Feature::attributes`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTableReader {
    pub delimiter: u8,
    pub skip_rows: usize,
    pub mz_column: String,
    pub name_column: String,
}

impl Default for FeatureTableReader {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            skip_rows: DEFAULT_SKIP_ROWS,
            mz_column: DEFAULT_MZ_COLUMN.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
        }
    }
}

impl FeatureTableReader {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn mz_column(mut self, column: impl Into<String>) -> Self {
        self.mz_column = column.into();
        self
    }

    pub fn name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = column.into();
        self
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<Vec<Feature>, TextError> {
        let mut reader = io::BufReader::new(reader);
        let mut buf = String::new();
        for _ in 0..self.skip_rows {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let mz_idx = headers
            .iter()
            .position(|h| *h == self.mz_column)
            .ok_or_else(|| TextError::MissingColumn {
                column: self.mz_column.clone(),
                available: headers.clone(),
            })?;
        let name_idx = headers.iter().position(|h| *h == self.name_column);
        if name_idx.is_none() {
            log::debug!(
                "Column {:?} not found, naming features by m/z",
                self.name_column
            );
        }

        let mut features = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default()
                + self.skip_rows as u64;
            let mz_text = record.get(mz_idx).unwrap_or_default().trim();
            let mz: f64 = parse_number(mz_text, line)?;
            let name = name_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(mz_text)
                .to_string();
            let attributes = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != mz_idx && Some(*i) != name_idx)
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default().to_string()))
                .collect();
            features.push(Feature::with_attributes(name, mz, attributes));
        }
        log::debug!("Read {} features", features.len());
        Ok(features)
    }

    pub fn read_path<P: AsRef<path::Path>>(&self, path: P) -> Result<Vec<Feature>, TextError> {
        self.read(fs::File::open(path)?)
    }
}

/// Writes a [`FeatureTable`] as a delimited table: name, m/z, the passthrough
/// attributes, then [`RESULT_COLUMNS`]. Absent values are written as empty cells.
/// Rows flagged deleted are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTableWriter {
    pub delimiter: u8,
    pub mz_column: String,
    pub name_column: String,
}

impl Default for FeatureTableWriter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            mz_column: DEFAULT_MZ_COLUMN.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
        }
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn result_cells(row: &MatchResult) -> [String; 9] {
    [
        opt_cell(row.matched_mz()),
        opt_cell(row.matched_intensity()),
        opt_cell(row.ppm_error()),
        opt_cell(row.left_boundary_mz()),
        opt_cell(row.right_boundary_mz()),
        opt_cell(row.left_boundary_intensity()),
        opt_cell(row.right_boundary_intensity()),
        opt_cell(row.peak_width_da()),
        opt_cell(row.peak_width_ppm()),
    ]
}

impl FeatureTableWriter {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn mz_column(mut self, column: impl Into<String>) -> Self {
        self.mz_column = column.into();
        self
    }

    pub fn name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = column.into();
        self
    }

    pub fn write<W: Write>(&self, table: &FeatureTable, writer: W) -> Result<W, TextError> {
        // Attribute columns in first-seen order across all rows
        let mut attribute_keys: Vec<&str> = Vec::new();
        for row in table.active() {
            for (k, _) in row.feature.attributes.iter() {
                if !attribute_keys.contains(&k.as_str()) {
                    attribute_keys.push(k.as_str());
                }
            }
        }

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        let mut header: Vec<&str> = vec![self.name_column.as_str(), self.mz_column.as_str()];
        header.extend(attribute_keys.iter().copied());
        header.extend(RESULT_COLUMNS);
        csv_writer.write_record(&header)?;

        for row in table.active() {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            record.push(row.feature.name.clone());
            record.push(row.feature.mz.to_string());
            for key in attribute_keys.iter() {
                record.push(row.feature.attribute(key).unwrap_or_default().to_string());
            }
            record.extend(result_cells(row));
            csv_writer.write_record(&record)?;
        }
        csv_writer
            .into_inner()
            .map_err(|e| TextError::Io(e.into_error()))
    }

    pub fn write_path<P: AsRef<path::Path>>(
        &self,
        table: &FeatureTable,
        path: P,
    ) -> Result<(), TextError> {
        let writer = io::BufWriter::new(fs::File::create(path)?);
        self.write(table, writer)?.flush()?;
        Ok(())
    }
}

/// Write `table` with the default [`FeatureTableWriter`]
pub fn write_feature_table<W: Write>(table: &FeatureTable, writer: W) -> Result<W, TextError> {
    FeatureTableWriter::default().write(table, writer)
}
