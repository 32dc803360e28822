use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, Seek, Write};

use xxhash_rust::xxh3::Xxh3Builder;

use crate::error::{Result, UsageError};

/// Per-customer usage totals, kept in order of first appearance so that
/// ties resolve to the customer seen earliest in the file.
pub struct UsageAggregator {
    index: HashMap<String, usize, Xxh3Builder>,
    entries: Vec<CustomerTotal>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CustomerTotal {
    pub customer: String,
    pub total: u64,
}

/// The highest and lowest consumers after aggregation.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct UsageReport {
    pub highest: CustomerTotal,
    pub lowest: CustomerTotal,
}

impl UsageAggregator {
    pub fn new() -> Self {
        UsageAggregator {
            index: HashMap::with_capacity_and_hasher(512, Xxh3Builder::new()),
            entries: Vec::with_capacity(512),
        }
    }

    pub fn run(&mut self, filename: &str, output: &mut dyn Write) -> Result<()> {
        self.process_chunk(filename, 0, 0)?.write(output)?;
        Ok(())
    }

    /// Reads records from `start` up to the first line boundary past `end`
    /// (`end == 0` means until EOF). A chunk starting mid-file skips its
    /// first, incomplete line; the preceding chunk reads past its own end
    /// offset to pick it up, so no record is lost or counted twice. The
    /// offset advances by the raw byte count of each line, terminator
    /// included, so LF and CRLF files chunk identically.
    pub fn process_chunk(&mut self, filename: &str, start: u64, end: u64) -> Result<&Self> {
        let mut file = File::open(filename)?;
        file.seek(io::SeekFrom::Start(start))?;
        let mut reader = io::BufReader::new(file);
        let mut curr = start;
        let mut first = true;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            curr += read as u64;
            if first && start != 0 {
                first = false;
                continue;
            }
            self.add(line.strip_suffix('\n').unwrap_or(&line))?;
            if end != 0 && curr > end {
                break;
            }
        }

        Ok(self)
    }

    pub fn add(&mut self, line: &str) -> Result<()> {
        let (customer, usage) = parse(line)?;
        self.accumulate(customer, usage)
    }

    fn accumulate(&mut self, customer: String, usage: u64) -> Result<()> {
        match self.index.get(&customer) {
            Some(&slot) => {
                let entry = &mut self.entries[slot];
                match entry.total.checked_add(usage) {
                    Some(total) => entry.total = total,
                    None => {
                        return Err(UsageError::UsageOverflow {
                            customer: entry.customer.clone(),
                        })
                    }
                }
            }
            None => {
                self.index.insert(customer.clone(), self.entries.len());
                self.entries.push(CustomerTotal {
                    customer,
                    total: usage,
                });
            }
        }
        Ok(())
    }

    /// Folds `other` into `self`, preserving `other`'s first-appearance
    /// order. Merging chunk results in file order therefore yields the
    /// same entry order as a serial pass.
    pub fn merge(&mut self, other: UsageAggregator) -> Result<()> {
        for entry in other.entries {
            self.accumulate(entry.customer, entry.total)?;
        }
        Ok(())
    }

    /// Scans totals in first-appearance order; strict comparisons keep the
    /// earliest customer on a tied value for both extremes.
    pub fn extremes(&self) -> Result<UsageReport> {
        let mut iter = self.entries.iter();
        let first = iter.next().ok_or(UsageError::EmptyInput)?;
        let mut highest = first;
        let mut lowest = first;
        for entry in iter {
            if entry.total > highest.total {
                highest = entry;
            }
            if entry.total < lowest.total {
                lowest = entry;
            }
        }
        Ok(UsageReport {
            highest: highest.clone(),
            lowest: lowest.clone(),
        })
    }

    pub fn write(&self, output: &mut dyn Write) -> Result<()> {
        let report = self.extremes()?;
        writeln!(
            output,
            "highest: {};{}",
            report.highest.customer, report.highest.total
        )?;
        writeln!(
            output,
            "lowest: {};{}",
            report.lowest.customer, report.lowest.total
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.total).sum()
    }
}

fn parse(line: &str) -> Result<(String, u64)> {
    let Some((customer, usage)) = line.split_once(';') else {
        return Err(UsageError::MissingDelimiter {
            line: line.to_owned(),
        });
    };
    // the chunk reader only trims the `\n`; CRLF files leave the `\r` here
    let usage = usage.strip_suffix('\r').unwrap_or(usage);
    let usage = usage.parse().map_err(|source| UsageError::InvalidUsage {
        line: line.to_owned(),
        source,
    })?;
    Ok((customer.to_owned(), usage))
}
