//! Terminal clipboard through the OSC 52 escape sequence.

use std::{
    io::{self, Write},
    sync::Mutex,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::application::clipboard::{Clipboard, ClipboardError};

use super::lock::mutex_lock;

const SOURCE: &str = "infra::clipboard";

/// Common terminal limit for the base64 payload of one OSC 52 sequence.
pub const DEFAULT_MAX_OSC52_PAYLOAD: usize = 74_994;

pub struct Osc52Clipboard<W> {
    writer: Mutex<W>,
    max_payload: usize,
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            max_payload: DEFAULT_MAX_OSC52_PAYLOAD,
        }
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let encoded = STANDARD.encode(text.as_bytes());
        if encoded.len() > self.max_payload {
            return Err(ClipboardError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.max_payload,
            });
        }

        let mut writer = mutex_lock(&self.writer, SOURCE, "write_text");
        write!(writer, "\x1b]52;c;{encoded}\x07")?;
        writer.flush()?;
        Ok(())
    }
}
