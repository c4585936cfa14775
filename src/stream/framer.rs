pub const RECORD_DELIMITER: u8 = b'\n';

/// Longest record accepted before the framer gives up on it.
pub const MAX_RECORD_LEN: usize = 64 * 1024;

/// Reassembles newline-delimited text records from a byte stream that may be
/// split at arbitrary points. Blank records and records that are not valid
/// UTF-8 are skipped; a trailing `\r` is removed.
#[derive(Debug, Default)]
pub struct RecordFramer {
    pending: Vec<u8>,
    discarding: bool,
}

impl RecordFramer {
    pub fn new() -> Self {
        RecordFramer::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_RECORD_LEN && !self.pending.contains(&RECORD_DELIMITER) {
            // Oversized record: drop what we have and skip through the next delimiter.
            self.pending.clear();
            self.discarding = true;
        }
    }

    pub fn next_record(&mut self) -> Option<String> {
        loop {
            let end = self.pending.iter().position(|&b| b == RECORD_DELIMITER)?;
            let mut record: Vec<u8> = self.pending.drain(..=end).collect();
            record.pop();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if record.last() == Some(&b'\r') {
                record.pop();
            }
            match String::from_utf8(record) {
                Ok(text) if !text.trim().is_empty() => return Some(text),
                _ => continue,
            }
        }
    }

    /// Bytes received that do not yet form a complete record.
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
