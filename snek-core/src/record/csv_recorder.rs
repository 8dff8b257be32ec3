use super::{Record, RecordValue, Recorder};
use anyhow::Result;
use log::warn;
use std::{fs, fs::File, path::Path};

/// A recorder that appends one CSV row per training iteration.
///
/// The column set is fixed by the scalar keys of the first record written,
/// sorted by name; later records fill the same columns, leaving cells empty
/// for missing keys. Records without any scalar value are skipped.
pub struct CsvRecorder {
    wtr: csv::Writer<File>,
    keys: Option<Vec<String>>,
}

impl CsvRecorder {
    /// Creates a recorder writing to the CSV file at `path`.
    ///
    /// Parent directories are created if they do not exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let wtr = csv::Writer::from_path(path)?;
        Ok(Self { wtr, keys: None })
    }
}

impl Recorder for CsvRecorder {
    fn write(&mut self, step: usize, record: Record) {
        let keys = match &self.keys {
            Some(keys) => keys,
            None => {
                let mut keys = record
                    .iter()
                    .filter_map(|(k, v)| match v {
                        RecordValue::Scalar(_) => Some(k.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                if keys.is_empty() {
                    return;
                }
                keys.sort();
                let mut header = vec!["step".to_string()];
                header.extend(keys.iter().cloned());
                if let Err(e) = self.wtr.write_record(&header) {
                    warn!("Failed to write CSV header: {}", e);
                    return;
                }
                self.keys = Some(keys);
                self.keys.as_ref().unwrap()
            }
        };

        let mut row = vec![step.to_string()];
        for k in keys {
            let cell = match record.get_scalar(k) {
                Ok(v) => v.to_string(),
                Err(_) => String::new(),
            };
            row.push(cell);
        }
        if let Err(e) = self.wtr.write_record(&row) {
            warn!("Failed to write CSV row: {}", e);
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn writes_header_and_rows() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let path = dir.path().join("logs").join("train.csv");

        let mut recorder = CsvRecorder::new(&path)?;
        // A record without scalars is skipped and does not fix the header.
        recorder.write(0, Record::empty());

        let mut r = Record::from_scalar("mean_reward", 1.5);
        r.insert("mean_length", RecordValue::Scalar(3.0));
        recorder.write(1, r);
        recorder.write(2, Record::from_scalar("mean_reward", 2.5));
        recorder.flush()?;

        let contents = fs::read_to_string(&path)?;
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "step,mean_length,mean_reward");
        assert_eq!(lines[1], "1,3,1.5");
        // Missing key leaves its cell empty.
        assert_eq!(lines[2], "2,,2.5");
        Ok(())
    }
}
