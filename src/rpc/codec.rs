use super::RpcError;

const DELIMITER: char = '#';

/// Frames one JSON document.
pub fn encode_frame(json: &str) -> Vec<u8> {
    let len = json.encode_utf16().count();
    format!("{len}{DELIMITER}{json}").into_bytes()
}

/// Largest frame body accepted, in UTF-16 code units.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
const MAX_PREFIX_DIGITS: usize = 10;

/// Incremental decoder for `<length>#<json>` frames split arbitrarily across
/// reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    text: String,
    // Trailing bytes of an incomplete UTF-8 sequence.
    partial: Vec<u8>,
    // Declared length of the frame being read. Its prefix is already drained.
    expected: Option<usize>,
    // Part of `text` already counted towards the current body.
    scanned_units: usize,
    scanned_bytes: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<(), RpcError> {
        self.partial.extend_from_slice(bytes);
        match std::str::from_utf8(&self.partial) {
            Ok(s) => {
                self.text.push_str(s);
                self.partial.clear();
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let prefix = std::str::from_utf8(&self.partial[..valid])
                    .map_err(|e| RpcError::Codec(e.to_string()))?;
                self.text.push_str(prefix);
                self.partial.drain(..valid);
            }
            Err(e) => return Err(RpcError::Codec(format!("invalid UTF-8: {e}"))),
        }
        Ok(())
    }

    /// Next complete frame body, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<String>, RpcError> {
        let expected = match self.expected {
            Some(expected) => expected,
            None => match self.read_header()? {
                Some(expected) => expected,
                None => return Ok(None),
            },
        };

        for c in self.text[self.scanned_bytes..].chars() {
            if self.scanned_units >= expected {
                break;
            }
            self.scanned_units += c.len_utf16();
            self.scanned_bytes += c.len_utf8();
        }
        if self.scanned_units < expected {
            return Ok(None);
        }
        if self.scanned_units > expected {
            return Err(RpcError::Codec("length splits a character".to_string()));
        }

        let body: String = self.text.drain(..self.scanned_bytes).collect();
        self.expected = None;
        self.scanned_units = 0;
        self.scanned_bytes = 0;
        Ok(Some(body))
    }

    fn read_header(&mut self) -> Result<Option<usize>, RpcError> {
        let Some(delimiter_at) = self
            .text
            .bytes()
            .take(MAX_PREFIX_DIGITS + 1)
            .position(|b| b == DELIMITER as u8)
        else {
            if self.text.len() > MAX_PREFIX_DIGITS {
                return Err(RpcError::Codec("length prefix too long".to_string()));
            }
            if self.text.chars().any(|c| !c.is_ascii_digit()) {
                return Err(RpcError::Codec("length prefix is not a number".to_string()));
            }
            return Ok(None);
        };

        let prefix = &self.text[..delimiter_at];
        let expected: usize = prefix
            .parse()
            .map_err(|_| RpcError::Codec(format!("bad length prefix {prefix:?}")))?;
        if expected > MAX_FRAME_LEN {
            return Err(RpcError::Codec(format!(
                "frame of {expected} units exceeds the {MAX_FRAME_LEN} limit"
            )));
        }

        self.text.drain(..delimiter_at + DELIMITER.len_utf8());
        self.expected = Some(expected);
        Ok(Some(expected))
    }
}
