//! Scripted stand-in for a serial port, used by the unit tests.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

#[derive(Debug, Default)]
pub(crate) struct MockPort {
    input: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
}

impl MockPort {
    pub(crate) fn with_bytes(bytes: &[u8]) -> Self {
        Self {
            input: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queue each line followed by the terminator
    pub(crate) fn with_lines(lines: &[&str]) -> Self {
        let mut port = Self::default();
        for line in lines {
            port.input.extend(line.as_bytes());
            port.input.push_back(b'\n');
        }
        port
    }

    pub(crate) fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.input.len()
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.written
    }

    /// Everything written so far, split into directives
    pub(crate) fn directives(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.input.pop_front() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => Err(io::Error::new(ErrorKind::TimedOut, "no data queued")),
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "port closed"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
