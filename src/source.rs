//! Raw input sources and the lazy decoded-record stream.
//!
//! A [`RecordStream`] reads one line at a time from standard input or from
//! a list of files opened in order, decodes it into an [`EventRecord`],
//! and yields it. File boundaries are invisible: the last record of one
//! file is followed directly by the first record of the next.
//!
//! Lines that fail to decode, including lines that are not valid UTF-8,
//! are logged, counted in [`DecodeStats`], and dropped. Only I/O failures
//! are returned as errors.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::error::SourceError;
use crate::record::EventRecord;

/// Where raw event lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    /// Files read back to back, in the given order.
    Files(Vec<PathBuf>),
}

impl Source {
    /// Files if any were given, otherwise standard input.
    pub fn from_paths(paths: Vec<PathBuf>) -> Source {
        if paths.is_empty() {
            Source::Stdin
        } else {
            Source::Files(paths)
        }
    }

    /// Open a single-pass decoded stream over this source.
    pub fn records(self) -> RecordStream {
        match self {
            Source::Stdin => RecordStream::new(vec![Input::Reader {
                origin: "<stdin>".to_string(),
                reader: Box::new(io::stdin()),
            }]),
            Source::Files(paths) => RecordStream::new(paths.into_iter().map(Input::Path).collect()),
        }
    }
}

/// Counters for the decode step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Non-blank raw lines read.
    pub lines: usize,
    /// Lines turned into records.
    pub decoded: usize,
    /// Lines dropped with a diagnostic.
    pub dropped: usize,
}

enum Input {
    Path(PathBuf),
    Reader {
        origin: String,
        reader: Box<dyn Read>,
    },
}

struct OpenInput {
    origin: String,
    reader: csv::Reader<Box<dyn Read>>,
}

/// Lazy, order-preserving, single-pass iterator of decoded records.
pub struct RecordStream {
    pending: std::vec::IntoIter<Input>,
    current: Option<OpenInput>,
    stats: DecodeStats,
}

impl RecordStream {
    fn new(inputs: Vec<Input>) -> RecordStream {
        RecordStream {
            pending: inputs.into_iter(),
            current: None,
            stats: DecodeStats::default(),
        }
    }

    /// Stream over an arbitrary reader, e.g. an in-memory buffer.
    pub fn from_reader<R: Read + 'static>(origin: &str, reader: R) -> RecordStream {
        RecordStream::new(vec![Input::Reader {
            origin: origin.to_string(),
            reader: Box::new(reader),
        }])
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn open_next(&mut self) -> Option<Result<(), SourceError>> {
        let input = self.pending.next()?;
        let (origin, reader): (String, Box<dyn Read>) = match input {
            Input::Path(path) => match File::open(&path) {
                Ok(file) => (path.display().to_string(), Box::new(file)),
                Err(source) => return Some(Err(SourceError::Open { path, source })),
            },
            Input::Reader { origin, reader } => (origin, reader),
        };
        log::debug!("reading events from {origin}");
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        self.current = Some(OpenInput { origin, reader });
        Some(Ok(()))
    }
}

impl Iterator for RecordStream {
    type Item = Result<EventRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut raw = csv::ByteRecord::new();
        loop {
            let Some(input) = self.current.as_mut() else {
                match self.open_next()? {
                    Ok(()) => continue,
                    Err(e) => return Some(Err(e)),
                }
            };

            match input.reader.read_byte_record(&mut raw) {
                Ok(true) => {}
                Ok(false) => {
                    self.current = None;
                    continue;
                }
                Err(source) => {
                    let origin = input.origin.clone();
                    self.current = None;
                    return Some(Err(SourceError::Read { origin, source }));
                }
            }

            if raw.iter().all(|field| field.trim_ascii().is_empty()) {
                continue;
            }
            self.stats.lines += 1;
            let line = raw.position().map(|p| p.line()).unwrap_or(0);

            let fields = match raw
                .iter()
                .map(std::str::from_utf8)
                .collect::<Result<Vec<&str>, _>>()
            {
                Ok(fields) => fields,
                Err(e) => {
                    log::warn!("{}:{line}: dropping record: {e}", input.origin);
                    self.stats.dropped += 1;
                    continue;
                }
            };
            match EventRecord::from_fields(&fields) {
                Ok(record) => {
                    self.stats.decoded += 1;
                    return Some(Ok(record));
                }
                Err(e) => {
                    log::warn!("{}:{line}: dropping record: {e}", input.origin);
                    self.stats.dropped += 1;
                }
            }
        }
    }
}
