use super::{normalize_name, scan_rows};
use crate::constants::DOG_NAME_COLUMN;
use crate::error::Result;
use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: u64,
}

/// Tally of keys that remembers the order keys were first seen, so ranking
/// breaks ties deterministically.
#[derive(Debug, Default)]
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    tallies: Vec<NameCount>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: String) {
        match self.index.get(&key) {
            Some(&i) => self.tallies[i].count += 1,
            None => {
                self.index.insert(key.clone(), self.tallies.len());
                self.tallies.push(NameCount { name: key, count: 1 });
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.tallies.len()
    }

    /// The `k` most frequent keys, highest count first. Equal counts keep
    /// first-seen order.
    pub fn top(mut self, k: usize) -> Vec<NameCount> {
        // sort_by is stable
        self.tallies.sort_by(|a, b| b.count.cmp(&a.count));
        self.tallies.truncate(k);
        self.tallies
    }
}

/// The `k` most common normalized dog names in the file.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn top_names(path: &Path, k: usize) -> Result<Vec<NameCount>> {
    info!("Finding the top {} dog names", k);
    let mut tally = FrequencyCounter::new();

    let scanned = scan_rows(path, &[DOG_NAME_COLUMN], |row| {
        tally.add(normalize_name(row.field(0)));
        Ok(())
    });

    match scanned {
        Ok(rows) => {
            counter!("licence_rows_scanned_total", "operation" => "top_names").increment(rows as u64);
            info!("Ranked {} distinct dog names from {} rows", tally.distinct(), rows);
            Ok(tally.top(k))
        }
        Err(e) => {
            error!("Error finding the top dog names: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn counted(names: &[&str], k: usize) -> Vec<NameCount> {
        let mut c = FrequencyCounter::new();
        for n in names {
            c.add(normalize_name(n));
        }
        c.top(k)
    }

    #[test]
    fn mixed_case_names_collapse() {
        let top = counted(&["Rex", "rex", "Bella", "REX"], 1);
        assert_eq!(
            top,
            vec![NameCount {
                name: "rex".into(),
                count: 3
            }]
        );
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let top = counted(&["max", "bella", "luna", "bella", "max", "luna"], 3);
        let names: Vec<_> = top.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["max", "bella", "luna"]);
    }

    #[test]
    fn top_is_bounded_and_descending() {
        let names = ["a", "b", "b", "c", "c", "c", "d", "e", "f", "g", "g"];
        let top = counted(&names, 5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
        assert!(top.iter().map(|n| n.count).sum::<u64>() <= names.len() as u64);
        assert_eq!(top[0].name, "c");
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(counted(&["rex"], 0).is_empty());
    }

    #[test]
    fn top_names_reads_dog_name_column() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"Breed,DogName\nPug, Rex\nPug,rex\nPug,Bella\nPug,REX\n").unwrap();
        let top = top_names(f.path(), 5).unwrap();
        assert_eq!(top[0], NameCount { name: "rex".into(), count: 3 });
        assert_eq!(top[1], NameCount { name: "bella".into(), count: 1 });
        assert_eq!(top.len(), 2);
    }
}
