//! Text command endpoint.
//!
//! A write-style call takes one line
//! `adapter_number device_number gpio_base gpio_len [pullups] [leds]` and a
//! read-style call returns [`USAGE`]. Numbers use C `%i` notation: decimal,
//! `0x`-prefixed hex or `0`-prefixed octal.

use crate::entry::EntryId;
use crate::loader::Loader;
use evo_common::expander::driver::LoadError;
use evo_common::expander::types::Request;
use std::sync::Arc;
use tracing::debug;

/// Text returned by [`ControlEndpoint::show`].
pub const USAGE: &str = "MCP23008/MCP23017 Loader\n\
Usage: <adapter-number> <device-number> <gpio-base> <gpio-len> [<pullups>] [<leds:bool>]\n";

/// Fields beyond this count are ignored.
const MAX_FIELDS: usize = 6;

/// Fields that must parse for a line to be accepted.
const MIN_FIELDS: usize = 4;

/// Parse the leading integer of `token` in `%i` notation.
///
/// Returns the value and whether the whole token was consumed. Negative
/// numbers are rejected.
fn parse_number(token: &str) -> Option<(u64, bool)> {
    let body = token.strip_prefix('+').unwrap_or(token);
    let (digits, radix) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_hexdigit()))
    {
        (hex, 16)
    } else if body.starts_with('0') {
        (body, 8)
    } else {
        (body, 10)
    };

    let len = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if len == 0 {
        return None;
    }
    let value = u64::from_str_radix(&digits[..len], radix).ok()?;
    Some((value, len == digits.len()))
}

fn narrow<T: TryFrom<u64>>(value: u64, field: &str) -> Result<T, LoadError> {
    T::try_from(value)
        .map_err(|_| LoadError::InvalidArgument(format!("{field} {value} out of range")))
}

/// Parse a command line into a [`Request`].
///
/// Fields are read left to right. A token contributes its leading number;
/// reading stops at the first token that does not start with one, or right
/// after a token with trailing characters (`8abc` reads as a final 8).
///
/// # Errors
/// `LoadError::InvalidArgument` if fewer than four numbers were read or a
/// value does not fit its field.
pub fn parse_request(line: &str) -> Result<Request, LoadError> {
    let mut fields = Vec::with_capacity(MAX_FIELDS);
    for token in line.split_whitespace().take(MAX_FIELDS) {
        let Some((value, whole)) = parse_number(token) else {
            break;
        };
        fields.push(value);
        if !whole {
            break;
        }
    }

    if fields.len() < MIN_FIELDS {
        return Err(LoadError::InvalidArgument(format!(
            "expected at least {MIN_FIELDS} numeric fields, got {}",
            fields.len()
        )));
    }

    let request = Request {
        bus_id: narrow(fields[0], "adapter number")?,
        device_address: narrow(fields[1], "device number")?,
        base_offset: narrow(fields[2], "gpio base")?,
        channel_count: narrow(fields[3], "gpio length")?,
        pullups: fields.get(4).map_or(Ok(0), |&v| narrow(v, "pullups"))?,
        indicators: fields.get(5).is_some_and(|&v| v != 0),
    };
    Ok(request)
}

/// The control surface in front of a [`Loader`].
pub struct ControlEndpoint {
    loader: Arc<Loader>,
}

impl ControlEndpoint {
    /// Expose `loader` through the text interface.
    pub fn new(loader: Arc<Loader>) -> Self {
        Self { loader }
    }

    /// Loader behind this endpoint.
    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    /// Read-style call.
    pub fn show(&self) -> &'static str {
        USAGE
    }

    /// Parse and execute one line; the entry id on success.
    pub fn execute(&self, line: &str) -> Result<EntryId, LoadError> {
        let request = parse_request(line)?;
        debug!("Parsed request {:?}", request);
        self.loader.create(&request)
    }

    /// Write-style call.
    ///
    /// Returns the number of bytes consumed (the whole line) on success, or
    /// the negative errno for the failure.
    pub fn store(&self, line: &str) -> Result<usize, i32> {
        self.execute(line)
            .map(|_| line.len())
            .map_err(|e| e.errno())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_notations() {
        assert_eq!(parse_number("32"), Some((32, true)));
        assert_eq!(parse_number("0x20"), Some((32, true)));
        assert_eq!(parse_number("0X1f"), Some((31, true)));
        assert_eq!(parse_number("040"), Some((32, true)));
        assert_eq!(parse_number("0"), Some((0, true)));
        assert_eq!(parse_number("+8"), Some((8, true)));
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("+"), None);
    }

    #[test]
    fn parse_number_takes_leading_digits() {
        assert_eq!(parse_number("8abc"), Some((8, false)));
        assert_eq!(parse_number("08"), Some((0, false)));
        assert_eq!(parse_number("0x"), Some((0, false)));
        assert_eq!(parse_number("0xfg"), Some((15, false)));
        assert_eq!(parse_number("12,"), Some((12, false)));
    }

    #[test]
    fn parse_minimal_line() {
        let request = parse_request("0 32 100 8").unwrap();
        assert_eq!(request, Request::new(0, 0x20, 100, 8));
    }

    #[test]
    fn parse_full_line() {
        let request = parse_request("1 0x21 200 16 0xff00 1\n").unwrap();
        assert_eq!(request.bus_id, 1);
        assert_eq!(request.device_address, 0x21);
        assert_eq!(request.channel_count, 16);
        assert_eq!(request.pullups, 0xff00);
        assert!(request.indicators);
    }

    #[test]
    fn leds_flag_is_nonzero_test() {
        assert!(!parse_request("0 32 100 8 0 0").unwrap().indicators);
        assert!(parse_request("0 32 100 8 0 2").unwrap().indicators);
    }

    #[test]
    fn too_few_fields_rejected() {
        assert!(matches!(
            parse_request("0 32 100"),
            Err(LoadError::InvalidArgument(_))
        ));
        assert!(parse_request("").is_err());
        assert!(parse_request("0 32 x 8").is_err());
    }

    #[test]
    fn parsing_stops_at_first_non_number() {
        let request = parse_request("0 32 100 8 junk 1").unwrap();
        assert_eq!(request.pullups, 0);
        assert!(!request.indicators);
    }

    #[test]
    fn trailing_characters_end_the_line() {
        let request = parse_request("0 32 100 8abc").unwrap();
        assert_eq!(request, Request::new(0, 0x20, 100, 8));

        // Fields after a partly numeric token are not read.
        let request = parse_request("0 32 100 8, 0xff 1").unwrap();
        assert_eq!(request.pullups, 0);
        assert!(!request.indicators);

        assert!(parse_request("0 32 100x 8").is_err());
    }

    #[test]
    fn out_of_range_values_rejected() {
        assert!(parse_request("0 70000 100 8").is_err());
        assert!(parse_request("0 32 100 8 0x10000").is_err());
        assert!(parse_request("0x100000000 32 100 8").is_err());
    }

    #[test]
    fn usage_mentions_fields() {
        assert!(USAGE.starts_with("MCP23008/MCP23017 Loader\n"));
        assert!(USAGE.contains("<gpio-len>"));
        assert!(USAGE.ends_with('\n'));
    }
}
