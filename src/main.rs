use std::fs;
use std::io::{self, prelude::*};
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use thiserror::Error;

use mzboundary::feature_list::{normalize_and_emit, EmitError, TextFeatureListSink};
use mzboundary::matcher::{
    FeatureMatcher, MatchError, DEFAULT_BOUNDARY_PPM, DEFAULT_MAX_PPM_ERROR,
    DEFAULT_MIN_INTENSITY_RATIO,
};
use mzboundary::provider::{ProviderError, Session, TextSpectrumProvider};
use mzboundary::summary::MatchSummary;
use mzboundary::text::{
    FeatureTableReader, FeatureTableWriter, TextError, DEFAULT_MZ_COLUMN, DEFAULT_NAME_COLUMN,
    DEFAULT_SKIP_ROWS,
};

fn non_negative_float_f64(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

fn single_byte(s: &str) -> Result<u8, String> {
    let s = if s == "\\t" { "\t" } else { s };
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(format!("`{s}` is not a single byte delimiter")),
    }
}

#[derive(Debug, Error)]
pub enum MZBoundaryError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to load the spectrum: {0}")]
    ProviderError(#[from] ProviderError),
    #[error("Failed to read or write a feature table: {0}")]
    TextError(#[from] TextError),
    #[error("Failed to match features: {0}")]
    MatchError(#[from] MatchError),
    #[error("Failed to create the feature list: {0}")]
    EmitError(#[from] EmitError),
    #[cfg(feature = "parallelism")]
    #[error("Failed to configure the thread pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

/// Match a table of target m/z values against a profile spectrum, find the
/// boundaries of each matched peak, and write them out as a feature list.
#[derive(Parser, Debug)]
#[command(author, version)]
pub struct MZBoundaryArgs {
    /// A two column m/z and intensity text file, or a directory holding one
    /// `<region-id>.txt` file per region
    #[arg(short = 's', long = "spectrum")]
    pub spectrum: PathBuf,

    /// The delimited table of target features
    #[arg(short = 'c', long = "csv-file")]
    pub csv_file: PathBuf,

    /// The region to load the spectrum of
    #[arg(short = 'r', long = "region-id", default_value = "1")]
    pub region_id: String,

    /// The name of the feature list to create
    #[arg(short = 'f', long = "feature-list-name")]
    pub feature_list_name: String,

    /// The column holding each feature's m/z
    #[arg(long = "mz-column", default_value = DEFAULT_MZ_COLUMN)]
    pub mz_column: String,

    /// The column holding each feature's name
    #[arg(long = "name-column", default_value = DEFAULT_NAME_COLUMN)]
    pub name_column: String,

    /// The number of lines to skip before the table header
    #[arg(long = "csv-skiprows", default_value_t = DEFAULT_SKIP_ROWS)]
    pub csv_skiprows: usize,

    /// The table's column delimiter
    #[arg(long = "csv-delimiter", default_value = ";", value_parser = single_byte)]
    pub csv_delimiter: u8,

    /// The largest ppm error between a feature and its closest sample to accept
    #[arg(long = "max-ppm-error", default_value_t = DEFAULT_MAX_PPM_ERROR, value_parser = non_negative_float_f64)]
    pub max_ppm_error: f64,

    /// How far left of a matched sample a peak may extend, in ppm
    #[arg(long = "left-ppm", default_value_t = DEFAULT_BOUNDARY_PPM, value_parser = non_negative_float_f64)]
    pub left_ppm: f64,

    /// How far right of a matched sample a peak may extend, in ppm
    #[arg(long = "right-ppm", default_value_t = DEFAULT_BOUNDARY_PPM, value_parser = non_negative_float_f64)]
    pub right_ppm: f64,

    /// The fraction of the matched intensity below which a peak ends
    #[arg(long = "min-intensity-ratio", default_value_t = DEFAULT_MIN_INTENSITY_RATIO)]
    pub min_intensity_ratio: f32,

    /// Write the feature table with its match results to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Write the feature list to this path, or if '-' is passed, to STDOUT
    #[arg(long = "feature-list-output", default_value = "-")]
    pub feature_list_output: PathBuf,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(short = 't', long = "threads", default_value_t = -1)]
    pub threads: i32,

    /// Log debug messages
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl MZBoundaryArgs {
    pub fn init_logging(&self) {
        let mut builder = pretty_env_logger::formatted_timed_builder();
        builder.filter_level(if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.init();
    }

    #[cfg(feature = "parallelism")]
    pub fn set_threadpool(&self) -> Result<(), MZBoundaryError> {
        if self.threads > 0 {
            log::debug!("Using {} threads", self.threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads as usize)
                .build_global()?;
        }
        Ok(())
    }

    #[cfg(not(feature = "parallelism"))]
    pub fn set_threadpool(&self) -> Result<(), MZBoundaryError> {
        if self.threads > 1 {
            log::warn!("Built without parallelism, ignoring --threads {}", self.threads);
        }
        Ok(())
    }

    fn matcher(&self) -> Result<FeatureMatcher, MatchError> {
        FeatureMatcher::builder()
            .max_ppm_error(self.max_ppm_error)
            .left_ppm(self.left_ppm)
            .right_ppm(self.right_ppm)
            .min_intensity_ratio(self.min_intensity_ratio)
            .build()
    }

    fn feature_list_writer(&self) -> io::Result<Box<dyn Write>> {
        if self.feature_list_output.as_os_str() == "-" {
            Ok(Box::new(io::stdout().lock()))
        } else {
            Ok(Box::new(io::BufWriter::new(fs::File::create(
                &self.feature_list_output,
            )?)))
        }
    }

    pub fn main(&self) -> Result<(), MZBoundaryError> {
        self.set_threadpool()?;
        let matcher = self.matcher()?;

        let mut session = Session::open(TextSpectrumProvider::new(&self.spectrum));
        let spectrum = session.spectrum(&self.region_id)?;

        log::info!("Loading features from {}", self.csv_file.display());
        let features = FeatureTableReader::default()
            .delimiter(self.csv_delimiter)
            .skip_rows(self.csv_skiprows)
            .mz_column(self.mz_column.as_str())
            .name_column(self.name_column.as_str())
            .read_path(&self.csv_file)?;
        log::info!("Loaded {} features", features.len());

        let mut table = matcher.match_features(&features, &spectrum)?;
        eprint!("{}", MatchSummary::from_table(&table));

        let mut sink = TextFeatureListSink::new(self.feature_list_writer()?);
        let emitted = normalize_and_emit(&mut table, &self.feature_list_name, &mut sink)?;
        sink.into_inner()?.flush()?;
        eprintln!(
            "Feature list '{}' created with {} features",
            self.feature_list_name, emitted.accepted_count
        );

        if let Some(output) = self.output.as_ref() {
            FeatureTableWriter::default()
                .mz_column(self.mz_column.as_str())
                .name_column(self.name_column.as_str())
                .write_path(&table, output)?;
            log::info!("Results saved to {}", output.display());
        }

        session.close();
        Ok(())
    }
}

fn main() -> Result<(), MZBoundaryError> {
    let args = MZBoundaryArgs::parse();
    args.init_logging();
    args.main()?;
    Ok(())
}
