use slog::{debug, Logger};

use crate::models::{ControlCommand, ControlMessage, SELECT_CMD};
use crate::stream::RecordFramer;

/// Decodes one control record. Anything that is not a well-formed `select` is `None`.
pub fn decode_command(record: &str) -> Option<ControlCommand> {
    let msg: ControlMessage = serde_json::from_str(record.trim()).ok()?;
    if msg.cmd != SELECT_CMD {
        return None;
    }
    ControlCommand::select(msg.idx, msg.ms)
}

/// Renders a command as a newline-terminated JSON record.
pub fn encode_command(cmd: ControlCommand) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&ControlMessage::from(cmd))?;
    line.push('\n');
    Ok(line)
}

/// Server side of the control direction. Bytes are fed in as they arrive and
/// commands are taken out without ever waiting for more input.
pub struct CommandChannel {
    framer: RecordFramer,
    dropped: u64,
    logger: Logger,
}

impl CommandChannel {
    pub fn new(logger: Logger) -> Self {
        CommandChannel {
            framer: RecordFramer::new(),
            dropped: 0,
            logger,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.framer.push(bytes);
    }

    /// Returns the next decodable command, silently discarding malformed records before it.
    pub fn try_decode_command(&mut self) -> Option<ControlCommand> {
        while let Some(record) = self.framer.next_record() {
            match decode_command(&record) {
                Some(cmd) => return Some(cmd),
                None => {
                    self.dropped += 1;
                    debug!(self.logger, "dropping malformed control record"; "record" => record);
                }
            }
        }
        None
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::{o, Discard};

    fn channel() -> CommandChannel {
        CommandChannel::new(Logger::root(Discard, o!()))
    }

    #[test]
    fn test_decode_valid() {
        let cmd = decode_command(r#"{"cmd": "select", "idx": 2, "ms": 50}"#).unwrap();
        assert_eq!(cmd.series_index(), 2);
        assert_eq!(cmd.interval_ms(), 50.0);
        let cmd = decode_command(r#"{"cmd":"select","idx":0,"ms":20.0}"#).unwrap();
        assert_eq!(cmd.interval_ms(), 20.0);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for record in [
            "",
            "select 1 20",
            r#"{"cmd":"stop","idx":0,"ms":20}"#,
            r#"{"cmd":"select","idx":-1,"ms":20}"#,
            r#"{"cmd":"select","idx":0,"ms":0}"#,
            r#"{"cmd":"select","idx":0,"ms":-10}"#,
            r#"{"cmd":"select","idx":0}"#,
            r#"{"cmd":"select","idx":"0","ms":20}"#,
            r#"{"cmd":"select","idx":0,"ms":20"#,
        ] {
            assert!(decode_command(record).is_none(), "accepted {record:?}");
        }
    }

    #[test]
    fn test_encode_round_trip() {
        let cmd = ControlCommand::select(4, 100.0).unwrap();
        let line = encode_command(cmd).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(decode_command(&line), Some(cmd));
    }

    #[test]
    fn test_channel_is_non_blocking() {
        let mut channel = channel();
        assert!(channel.try_decode_command().is_none());
        channel.feed(br#"{"cmd":"select","idx":1,"#);
        assert!(channel.try_decode_command().is_none());
        channel.feed(b"\"ms\":10}\n");
        assert_eq!(channel.try_decode_command().map(|c| c.series_index()), Some(1));
        assert!(channel.try_decode_command().is_none());
    }

    #[test]
    fn test_channel_skips_garbage_between_commands() {
        let mut channel = channel();
        channel.feed(b"garbage\n{\"cmd\":\"select\",\"idx\":0,\"ms\":10}\n{}\n{\"cmd\":\"select\",\"idx\":3,\"ms\":1000}\n");
        assert_eq!(channel.try_decode_command().map(|c| c.series_index()), Some(0));
        assert_eq!(channel.try_decode_command().map(|c| c.series_index()), Some(3));
        assert!(channel.try_decode_command().is_none());
        assert_eq!(channel.dropped(), 2);
    }
}
