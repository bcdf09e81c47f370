//! Request/response behaviour of the balance link against a scripted port.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use sc_instrument::{Instrument, InstrumentLink, LinkError, Transport};

enum Reply {
    Line(Vec<u8>),
    Fail(io::ErrorKind),
    /// `head` arrives in time, `tail` only after the read has timed out.
    Stall { head: Vec<u8>, tail: Vec<u8> },
}

/// Answers each weight poll with the next scripted reply.
#[derive(Default)]
struct ScriptedBalance {
    replies: VecDeque<Reply>,
    pending: VecDeque<u8>,
    pending_error: Option<io::ErrorKind>,
    late: Option<Vec<u8>>,
    /// Honour `discard_input` like a serial port with an OS buffer.
    buffered: bool,
    commands: Vec<[u8; 2]>,
    partial: Vec<u8>,
}

impl ScriptedBalance {
    fn reply(mut self, line: &str) -> Self {
        self.replies.push_back(Reply::Line(line.as_bytes().to_vec()));
        self
    }

    fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.replies.push_back(Reply::Fail(kind));
        self
    }

    fn stall(mut self, head: &str, tail: &str) -> Self {
        self.replies.push_back(Reply::Stall {
            head: head.as_bytes().to_vec(),
            tail: tail.as_bytes().to_vec(),
        });
        self
    }

    fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }
}

impl Write for ScriptedBalance {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        while self.partial.len() >= 2 {
            let cmd = [self.partial[0], self.partial[1]];
            self.partial.drain(..2);
            self.commands.push(cmd);
            if cmd == [0x1B, b'P'] {
                match self.replies.pop_front() {
                    Some(Reply::Line(bytes)) => self.pending.extend(bytes),
                    Some(Reply::Fail(kind)) => self.pending_error = Some(kind),
                    Some(Reply::Stall { head, tail }) => {
                        self.pending.extend(head);
                        self.late = Some(tail);
                    }
                    None => self.pending_error = Some(io::ErrorKind::TimedOut),
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ScriptedBalance {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(byte) = self.pending.pop_front() {
            buf[0] = byte;
            return Ok(1);
        }
        if let Some(tail) = self.late.take() {
            self.pending.extend(tail);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "reply stalled"));
        }
        match self.pending_error.take() {
            Some(kind) => Err(io::Error::new(kind, "scripted failure")),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
        }
    }
}

impl Transport for ScriptedBalance {
    fn discard_input(&mut self) -> io::Result<()> {
        if self.buffered {
            self.pending.clear();
        }
        Ok(())
    }
}

fn link(balance: ScriptedBalance) -> InstrumentLink<ScriptedBalance> {
    InstrumentLink::new(balance, Duration::from_millis(750))
}

#[test]
fn tare_sends_escape_t_and_reads_nothing() {
    let mut link = link(ScriptedBalance::default().reply("  1.0 g\r\n"));
    link.tare().unwrap();

    let balance = link.into_inner();
    assert_eq!(balance.commands, vec![[0x1B, b'T']]);
    assert!(balance.pending.is_empty());
}

#[test]
fn successive_polls_read_successive_lines() {
    let mut link = link(
        ScriptedBalance::default()
            .reply("     0.0000 g  \r\n")
            .reply("-    0.0510 g  \r\n")
            .reply("     0.2000 g  \r\n"),
    );

    let masses: Vec<f64> = (0..3).map(|_| link.read_mass().unwrap()).collect();
    assert_eq!(masses, vec![0.0, -0.051, 0.2]);
}

#[test]
fn silent_balance_times_out_with_configured_bound() {
    let mut link = link(ScriptedBalance::default().fail(io::ErrorKind::TimedOut));
    match link.read_mass() {
        Err(LinkError::Timeout { timeout_ms }) => assert_eq!(timeout_ms, 750),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn unplugged_port_is_io_failure() {
    let mut link = link(ScriptedBalance::default().fail(io::ErrorKind::BrokenPipe));
    assert!(matches!(link.read_mass(), Err(LinkError::Io(_))));
}

#[test]
fn garbage_reply_is_malformed_and_link_stays_usable() {
    let mut link = link(
        ScriptedBalance::default()
            .reply("Err L\r\n")
            .reply("  2.5 g\r\n"),
    );

    match link.read_mass() {
        Err(LinkError::MalformedResponse { line }) => assert_eq!(line, "Err L\r\n"),
        other => panic!("expected malformed response, got {other:?}"),
    }
    assert_eq!(link.read_mass().unwrap(), 2.5);
}

#[test]
fn late_tail_of_timed_out_reply_is_not_the_next_reading() {
    let mut link = link(
        ScriptedBalance::default()
            .stall("  1.2", "5 g\r\n")
            .reply("  1.30 g\r\n"),
    );

    assert!(link.read_mass().unwrap_err().is_timeout());
    assert_eq!(link.read_mass().unwrap(), 1.3);
    assert!(link.into_inner().pending.is_empty());
}

#[test]
fn late_whole_reply_is_discarded_by_buffered_port() {
    let mut link = link(
        ScriptedBalance::default()
            .buffered()
            .stall("", "  9.0 g\r\n")
            .reply("  1.0 g\r\n"),
    );

    assert!(link.read_mass().unwrap_err().is_timeout());
    assert_eq!(link.read_mass().unwrap(), 1.0);
}

#[test]
fn missing_tail_costs_one_timeout_then_link_recovers() {
    let mut link = link(
        ScriptedBalance::default()
            .stall("  3.", "")
            .reply("  0.5 g\r\n"),
    );

    assert!(link.read_mass().unwrap_err().is_timeout());
    assert_eq!(link.read_mass().unwrap(), 0.5);
}
