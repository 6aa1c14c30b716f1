//! Sources of spectra and a scoped session that releases them.
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::spectrum::Spectrum;
use crate::text::{self, TextError};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No spectrum found for region {0:?}")]
    RegionNotFound(String),
    #[error("Spectrum source {} does not exist", .0.display())]
    SourceNotFound(PathBuf),
    #[error("The spectrum source was already closed")]
    Closed,
    #[error("Failed to read spectrum: {0}")]
    Read(#[from] TextError),
}

/// Something that can produce a spectrum for a named region.
///
/// [`SpectrumProvider::close`] releases whatever the provider holds. Wrap a
/// provider in a [`Session`] to have it called exactly once.
pub trait SpectrumProvider {
    fn spectrum(&mut self, region: &str) -> Result<Spectrum<'static>, ProviderError>;

    fn close(&mut self);
}

/// Owns a [`SpectrumProvider`] and closes it once, either through
/// [`Session::close`] or when dropped.
#[derive(Debug)]
pub struct Session<P: SpectrumProvider> {
    provider: P,
    closed: bool,
}

impl<P: SpectrumProvider> Session<P> {
    pub fn open(provider: P) -> Self {
        log::debug!("Opening spectrum session");
        Self {
            provider,
            closed: false,
        }
    }

    pub fn spectrum(&mut self, region: &str) -> Result<Spectrum<'static>, ProviderError> {
        self.provider.spectrum(region)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("Closing spectrum session");
            self.provider.close();
        }
    }

    pub fn close(mut self) {
        self.close_once();
    }
}

impl<P: SpectrumProvider> Drop for Session<P> {
    fn drop(&mut self) {
        self.close_once();
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TextSource {
    /// One `<region>.txt` file per region
    Directory(PathBuf),
    /// The same file for every region
    File(PathBuf),
}

/// Reads two column spectrum text files from disk
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpectrumProvider {
    source: TextSource,
    open: bool,
}

impl TextSpectrumProvider {
    /// A directory holding one file per region, or a single file used for all regions
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_directory(path)
        } else {
            Self::from_file(path)
        }
    }

    pub fn from_directory<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: TextSource::Directory(path.as_ref().to_path_buf()),
            open: true,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: TextSource::File(path.as_ref().to_path_buf()),
            open: true,
        }
    }

    pub fn path_for(&self, region: &str) -> PathBuf {
        match &self.source {
            TextSource::Directory(dir) => dir.join(format!("{region}.txt")),
            TextSource::File(path) => path.clone(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl SpectrumProvider for TextSpectrumProvider {
    fn spectrum(&mut self, region: &str) -> Result<Spectrum<'static>, ProviderError> {
        if !self.open {
            return Err(ProviderError::Closed);
        }
        let path = match &self.source {
            TextSource::Directory(dir) if !dir.is_dir() => {
                return Err(ProviderError::SourceNotFound(dir.clone()))
            }
            TextSource::File(path) if !path.is_file() => {
                return Err(ProviderError::SourceNotFound(path.clone()))
            }
            _ => self.path_for(region),
        };
        if !path.is_file() {
            return Err(ProviderError::RegionNotFound(region.to_string()));
        }
        log::info!("Loading spectrum for region {region} from {}", path.display());
        let spectrum = text::read_spectrum(&path)?;
        log::info!(
            "Loaded spectrum with {} points, m/z range {:.4} - {:.4}",
            spectrum.len(),
            spectrum.min_mz,
            spectrum.max_mz
        );
        Ok(spectrum)
    }

    fn close(&mut self) {
        self.open = false;
    }
}
