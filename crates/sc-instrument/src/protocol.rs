//! Balance wire protocol.
//!
//! Commands are the escape byte followed by one ASCII letter. A weight poll
//! is answered with one line of whitespace-separated tokens, the first of
//! which is the weight. Some balances pad the sign away from the digits
//! (`"-    0.125 g"`), so a lone sign token is joined with the next one.

use crate::error::{LinkError, LinkResult};

/// Escape byte that prefixes every command.
pub const ESCAPE: u8 = 0x1B;

/// Longest response line read from the balance, in bytes.
pub const MAX_LINE_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Zero the current reading.
    Tare,
    /// Ask for the current weight.
    Poll,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Command::Tare => b'T',
            Command::Poll => b'P',
        }
    }

    pub fn encode(self) -> [u8; 2] {
        [ESCAPE, self.code()]
    }
}

/// Parse the weight out of one response line.
pub fn parse_weight(line: &str) -> LinkResult<f64> {
    let malformed = || LinkError::MalformedResponse {
        line: line.to_string(),
    };

    let mut tokens = line.split_whitespace();
    let first = tokens.next().ok_or_else(malformed)?;
    let text = if first == "-" || first == "+" {
        let digits = tokens.next().ok_or_else(malformed)?;
        format!("{first}{digits}")
    } else {
        first.to_string()
    };

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn commands_are_escape_prefixed() {
        assert_eq!(Command::Tare.encode(), [0x1B, b'T']);
        assert_eq!(Command::Poll.encode(), [0x1B, b'P']);
    }

    #[test]
    fn parses_plain_weight() {
        assert_eq!(parse_weight("   12.345 g\r\n").unwrap(), 12.345);
        assert_eq!(parse_weight("0.05").unwrap(), 0.05);
    }

    #[test]
    fn joins_detached_minus_sign() {
        assert_eq!(parse_weight("-     0.125 g").unwrap(), -0.125);
    }

    #[test]
    fn joins_detached_plus_sign() {
        assert_eq!(parse_weight("+  3.5 g").unwrap(), 3.5);
    }

    #[test]
    fn attached_sign_parses_directly() {
        assert_eq!(parse_weight("-0.002 g").unwrap(), -0.002);
    }

    #[test]
    fn empty_line_is_malformed() {
        assert!(matches!(
            parse_weight("  \r\n"),
            Err(LinkError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn lone_sign_without_digits_is_malformed() {
        assert!(matches!(
            parse_weight("-"),
            Err(LinkError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn non_numeric_token_is_malformed() {
        assert!(parse_weight("Err 04").is_err());
        assert!(parse_weight("- g").is_err());
        assert!(parse_weight("NaN g").is_err());
        assert!(parse_weight("inf").is_err());
    }

    proptest! {
        #[test]
        fn padded_sign_round_trips(value in 0.0_f64..10_000.0, pad in 1_usize..6) {
            let digits = format!("{value:.3}");
            let line = format!("-{}{} g\r\n", " ".repeat(pad), digits);
            let expected: f64 = format!("-{digits}").parse().unwrap();
            prop_assert_eq!(parse_weight(&line).unwrap(), expected);
        }

        #[test]
        fn never_panics_on_arbitrary_text(line in ".{0,40}") {
            let _ = parse_weight(&line);
        }
    }
}
