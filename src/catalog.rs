use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use std::io::BufRead;

use crate::bucket::Bucket;
use crate::error::CatalogError;
use crate::evaluate::{LayoutSource, evaluate};
use crate::output::MatchResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub line_no: usize,
    pub object: String,
    pub size: u64,
}

/// Parses `<identifier>\t<size>[\t...]`. Fields after the size are ignored.
pub fn parse_entry(line_no: usize, line: &str) -> Result<CatalogEntry, CatalogError> {
    let malformed = || CatalogError::Malformed {
        line_no,
        line: line.to_string(),
    };

    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
    let object = fields
        .next()
        .filter(|s| is_identifier(s))
        .ok_or_else(malformed)?;
    let size = fields
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&s| s > 0)
        .ok_or_else(malformed)?;

    Ok(CatalogEntry {
        line_no,
        object: object.to_string(),
        size,
    })
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'_' || b.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Direct,
    /// Below the bucket floor; only reachable through a flexible array.
    Elastic,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub entries: usize,
    pub direct_candidates: usize,
    pub elastic_candidates: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub failed: usize,
    pub matches: usize,
    pub elastic_matches: usize,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.entries += other.entries;
        self.direct_candidates += other.direct_candidates;
        self.elastic_candidates += other.elastic_candidates;
        self.skipped += other.skipped;
        self.malformed += other.malformed;
        self.failed += other.failed;
        self.matches += other.matches;
        self.elastic_matches += other.elastic_matches;
    }
}

pub struct Scanner<'s, S: LayoutSource + ?Sized> {
    source: &'s S,
    bucket: Bucket,
    want_elastic: bool,
    strict: bool,
}

impl<'s, S: LayoutSource + ?Sized> Scanner<'s, S> {
    pub fn new(source: &'s S, bucket: Bucket, want_elastic: bool) -> Self {
        Self {
            source,
            bucket,
            want_elastic,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn want_elastic(&self) -> bool {
        self.want_elastic
    }

    pub fn partition(&self, size: u64) -> Candidate {
        if self.bucket.contains(size) {
            Candidate::Direct
        } else if size <= self.bucket.floor && self.want_elastic {
            Candidate::Elastic
        } else {
            Candidate::Skip
        }
    }

    /// Evaluates one entry. Per-object inspector failures are logged and
    /// counted; only fatal ones are returned.
    pub fn evaluate_entry(
        &self,
        entry: &CatalogEntry,
        stats: &mut ScanStats,
    ) -> Result<Option<MatchResult>> {
        let elastic = match self.partition(entry.size) {
            Candidate::Direct => {
                stats.direct_candidates += 1;
                false
            }
            Candidate::Elastic => {
                stats.elastic_candidates += 1;
                true
            }
            Candidate::Skip => {
                stats.skipped += 1;
                return Ok(None);
            }
        };

        let verdict = match evaluate(self.source, &entry.object, elastic) {
            Ok(v) => v,
            Err(err) if err.is_fatal() => {
                return Err(err).with_context(|| format!("Failed to inspect {}", entry.object));
            }
            Err(err) => {
                warn!("Skipping {} (catalog line {}): {err}", entry.object, entry.line_no);
                stats.failed += 1;
                return Ok(None);
            }
        };

        if !verdict.matches(elastic) {
            return Ok(None);
        }

        stats.matches += 1;
        if elastic {
            stats.elastic_matches += 1;
        }
        Ok(Some(MatchResult {
            object: entry.object.clone(),
            elastic,
        }))
    }

    pub fn process_line(
        &self,
        line_no: usize,
        line: &str,
        stats: &mut ScanStats,
    ) -> Result<Option<MatchResult>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        stats.entries += 1;

        let entry = match parse_entry(line_no, line) {
            Ok(entry) => entry,
            Err(err) if self.strict => return Err(err.into()),
            Err(err) => {
                warn!("{err}");
                stats.malformed += 1;
                return Ok(None);
            }
        };
        debug!("{}: {} bytes", entry.object, entry.size);
        self.evaluate_entry(&entry, stats)
    }

    pub fn scan<R: BufRead>(&self, reader: R) -> Scan<'_, 's, S, R> {
        Scan {
            scanner: self,
            lines: reader.lines(),
            line_no: 0,
            stats: ScanStats::default(),
            done: false,
        }
    }
}

pub struct Scan<'a, 's, S: LayoutSource + ?Sized, R> {
    scanner: &'a Scanner<'s, S>,
    lines: std::io::Lines<R>,
    line_no: usize,
    stats: ScanStats,
    done: bool,
}

impl<S: LayoutSource + ?Sized, R> Scan<'_, '_, S, R> {
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}

impl<S: LayoutSource + ?Sized, R: BufRead> Iterator for Scan<'_, '_, S, R> {
    type Item = Result<MatchResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err).context("Failed to read catalog"));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line_no += 1;

            match self
                .scanner
                .process_line(self.line_no, &line, &mut self.stats)
            {
                Ok(Some(m)) => return Some(Ok(m)),
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
