use super::Record;
use anyhow::Result;

/// Writes records to an output destination.
pub trait Recorder {
    /// Writes a record for the given training iteration.
    fn write(&mut self, step: usize, record: Record);

    /// Flushes buffered records to the destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
