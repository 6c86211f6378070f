//! Configuration types for runtime and execution settings

use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::properties::PropertySource;

pub const SELECT_FILE_LIST: &str = "select_file_list";
pub const FILE_LOCATION: &str = "file_location";
pub const DESTINATION_FILE_NAME: &str = "destination_file_name";
pub const WORKER_POOL_SIZE: &str = "worker_pool_size";
pub const MATCH_CHUNK_SIZE: &str = "match_chunk_size";
pub const COPY_CHUNK_SIZE: &str = "copy_chunk_size";

pub const DEFAULT_WORKER_POOL_SIZE: usize = 200;
pub const DEFAULT_MATCH_CHUNK_SIZE: usize = 25;
pub const DEFAULT_COPY_CHUNK_SIZE: usize = 100;

/// Errors raised while turning properties into [`SelectSettings`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required property '{0}'")]
    MissingKey(&'static str),
    #[error("property '{key}' must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Only report errors
    pub quiet: bool,
    /// Verbosity level: 0=INFO, 1=DEBUG, 2+=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

/// Everything a selection run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectSettings {
    /// newline-delimited list of wanted names
    pub select_file_list: PathBuf,
    /// root of the tree searched for candidates
    pub file_location: PathBuf,
    /// directory receiving the copies
    pub destination: PathBuf,
    /// maximum number of concurrently running tasks
    pub worker_pool_size: NonZeroUsize,
    /// targets handled by one matching task
    pub match_chunk_size: NonZeroUsize,
    /// files handled by one copy task
    pub copy_chunk_size: NonZeroUsize,
}

fn required(source: &impl PropertySource, key: &'static str) -> Result<PathBuf, Error> {
    source
        .get_property(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(Error::MissingKey(key))
}

fn positive(
    source: &impl PropertySource,
    key: &'static str,
    default: usize,
) -> Result<NonZeroUsize, Error> {
    let value = match source.get_property(key) {
        None | Some("") => default,
        Some(value) => value.parse::<usize>().map_err(|_| Error::InvalidNumber {
            key,
            value: value.to_string(),
        })?,
    };
    NonZeroUsize::new(value).ok_or_else(|| Error::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

impl SelectSettings {
    pub fn from_properties(source: &impl PropertySource) -> Result<Self, Error> {
        Ok(Self {
            select_file_list: required(source, SELECT_FILE_LIST)?,
            file_location: required(source, FILE_LOCATION)?,
            destination: required(source, DESTINATION_FILE_NAME)?,
            worker_pool_size: positive(source, WORKER_POOL_SIZE, DEFAULT_WORKER_POOL_SIZE)?,
            match_chunk_size: positive(source, MATCH_CHUNK_SIZE, DEFAULT_MATCH_CHUNK_SIZE)?,
            copy_chunk_size: positive(source, COPY_CHUNK_SIZE, DEFAULT_COPY_CHUNK_SIZE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Properties;

    #[test]
    fn defaults_apply_when_optional_keys_are_absent() {
        let props = Properties::parse_content(
            "select_file_list=/s.txt\nfile_location=/in\ndestination_file_name=/out\n",
        );
        let settings = SelectSettings::from_properties(&props).unwrap();
        assert_eq!(settings.select_file_list, PathBuf::from("/s.txt"));
        assert_eq!(settings.file_location, PathBuf::from("/in"));
        assert_eq!(settings.destination, PathBuf::from("/out"));
        assert_eq!(settings.worker_pool_size.get(), 200);
        assert_eq!(settings.match_chunk_size.get(), 25);
        assert_eq!(settings.copy_chunk_size.get(), 100);
    }

    #[test]
    fn optional_keys_override_defaults() {
        let props = Properties::parse_content(
            "select_file_list=/s.txt\nfile_location=/in\ndestination_file_name=/out\n\
             worker_pool_size=8\nmatch_chunk_size=3\ncopy_chunk_size=\n",
        );
        let settings = SelectSettings::from_properties(&props).unwrap();
        assert_eq!(settings.worker_pool_size.get(), 8);
        assert_eq!(settings.match_chunk_size.get(), 3);
        assert_eq!(settings.copy_chunk_size.get(), 100);
    }

    #[test]
    fn missing_key_is_reported() {
        let props = Properties::parse_content("select_file_list=/s.txt\nfile_location=/in\n");
        match SelectSettings::from_properties(&props) {
            Err(Error::MissingKey(key)) => assert_eq!(key, DESTINATION_FILE_NAME),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        for bad in ["0", "-1", "many"] {
            let props = Properties::parse_content(&format!(
                "select_file_list=/s\nfile_location=/in\ndestination_file_name=/out\nmatch_chunk_size={bad}\n"
            ));
            let error = SelectSettings::from_properties(&props).unwrap_err();
            assert!(
                matches!(error, Error::InvalidNumber { key: MATCH_CHUNK_SIZE, .. }),
                "{error}"
            );
        }
    }
}
