//! Request/response link to the balance.

use std::io::{self, Read, Write};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LinkError, LinkResult};
use crate::protocol::{Command, MAX_LINE_LEN, parse_weight};

/// Most bytes skipped while looking for the end of an interrupted reply.
const RESYNC_LIMIT: usize = 4 * MAX_LINE_LEN;

/// Anything that can zero itself and report a mass in grams.
///
/// Implemented by [`InstrumentLink`] for real hardware and by
/// [`crate::SimulatedBalance`]. Calls are never issued concurrently.
pub trait Instrument: Send {
    fn tare(&mut self) -> LinkResult<()>;
    fn read_mass(&mut self) -> LinkResult<f64>;
}

impl<I: Instrument + ?Sized> Instrument for Box<I> {
    fn tare(&mut self) -> LinkResult<()> {
        (**self).tare()
    }

    fn read_mass(&mut self) -> LinkResult<f64> {
        (**self).read_mass()
    }
}

/// Byte stream under an [`InstrumentLink`].
pub trait Transport: Read + Write {
    /// Drop bytes that arrived but have not been read yet.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Blocking link over a byte stream (normally a serial port).
///
/// Holds at most one response line; nothing is read ahead. Before each
/// weight poll the link drops whatever is left of an earlier reply, so a
/// reply that arrives after its read timed out is never taken as the answer
/// to the next poll.
pub struct InstrumentLink<T> {
    transport: T,
    read_timeout: Duration,
    /// The last read stopped inside a reply line.
    mid_line: bool,
}

impl<T: Transport> InstrumentLink<T> {
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
            mid_line: false,
        }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, command: Command) -> LinkResult<()> {
        trace!(?command, "sending command");
        self.transport
            .write_all(&command.encode())
            .and_then(|_| self.transport.flush())
            .map_err(|e| LinkError::from_io(e, self.read_timeout))
    }

    /// Read one response line, up to `MAX_LINE_LEN` bytes.
    fn read_line(&mut self) -> LinkResult<String> {
        let mut line = Vec::with_capacity(MAX_LINE_LEN);
        let mut byte = [0_u8; 1];
        let mut complete = false;

        while line.len() < MAX_LINE_LEN {
            match self.transport.read(&mut byte) {
                Ok(0) => {
                    complete = true;
                    break;
                }
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        complete = true;
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.mid_line = !line.is_empty();
                    return Err(LinkError::from_io(e, self.read_timeout));
                }
            }
        }
        self.mid_line = !complete;

        if line.is_empty() {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "instrument closed the link",
            )));
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Drop stale input so the next line read answers the next poll.
    fn resync(&mut self) -> LinkResult<()> {
        if self.mid_line {
            self.mid_line = false;
            let skipped = self.skip_rest_of_line()?;
            debug!(skipped, "dropped the rest of an interrupted reply");
        }
        self.transport
            .discard_input()
            .map_err(|e| LinkError::from_io(e, self.read_timeout))
    }

    fn skip_rest_of_line(&mut self) -> LinkResult<usize> {
        let mut byte = [0_u8; 1];
        let mut skipped = 0;

        while skipped < RESYNC_LIMIT {
            match self.transport.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    skipped += 1;
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // The tail never came.
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    break;
                }
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
        Ok(skipped)
    }
}

impl<T: Transport + Send> Instrument for InstrumentLink<T> {
    fn tare(&mut self) -> LinkResult<()> {
        debug!("taring balance");
        self.send(Command::Tare)
    }

    fn read_mass(&mut self) -> LinkResult<f64> {
        self.resync()?;
        self.send(Command::Poll)?;
        let line = self.read_line()?;
        let mass = parse_weight(&line)?;
        trace!(mass, raw = line.trim_end(), "weight read");
        Ok(mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Replies from a fixed buffer and records what was written.
    struct Loopback {
        replies: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Loopback {
        fn new(replies: &[u8]) -> Self {
            Self {
                replies: Cursor::new(replies.to_vec()),
                written: Vec::new(),
            }
        }
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.replies.read(buf)
        }
    }

    impl Transport for Loopback {}

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_consumes_exactly_one_line() {
        let mut link = InstrumentLink::new(
            Loopback::new(b"  1.250 g\r\n-  0.5 g\r\n"),
            Duration::from_secs(1),
        );

        assert_eq!(link.read_mass().unwrap(), 1.25);
        assert_eq!(link.read_mass().unwrap(), -0.5);
        assert_eq!(link.into_inner().written, vec![0x1B, b'P', 0x1B, b'P']);
    }

    #[test]
    fn line_is_capped_without_newline() {
        let mut reply = b"7.5".to_vec();
        reply.extend(std::iter::repeat_n(b' ', 40));
        reply.extend_from_slice(b"9\n");
        let mut link = InstrumentLink::new(Loopback::new(&reply), Duration::from_secs(1));

        assert_eq!(link.read_mass().unwrap(), 7.5);
    }

    #[test]
    fn overlong_line_tail_is_not_read_as_next_reply() {
        let mut reply = b"  7.5".to_vec();
        reply.extend(std::iter::repeat_n(b' ', 30));
        reply.extend_from_slice(b"9 g\r\n  2.0 g\r\n");
        let mut link = InstrumentLink::new(Loopback::new(&reply), Duration::from_secs(1));

        assert_eq!(link.read_mass().unwrap(), 7.5);
        assert_eq!(link.read_mass().unwrap(), 2.0);
    }

    #[test]
    fn closed_stream_is_io_failure() {
        let mut link = InstrumentLink::new(Loopback::new(b""), Duration::from_secs(1));
        assert!(matches!(link.read_mass(), Err(LinkError::Io(_))));
    }
}
