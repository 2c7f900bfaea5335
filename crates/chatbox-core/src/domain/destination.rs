//! Parsing of user-entered destination addresses.
//!
//! Accepted forms:
//!
//! - `127.0.0.1:9000` – IPv4 with port
//! - `[::1]:9000` – IPv6 with port
//! - `192.168.1.20` or `::1` – bare IP, uses [`DEFAULT_OSC_PORT`]
//!
//! Host names are not resolved; the chatbox endpoint is always addressed by IP.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// VRChat's default OSC receive port.
pub const DEFAULT_OSC_PORT: u16 = 9000;

/// Error type for destination parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DestinationError {
    /// The input was empty or whitespace.
    #[error("destination is empty")]
    Empty,
    /// The input is neither `ip:port` nor a bare IP address.
    #[error("invalid destination {0:?}: expected IP:PORT")]
    Invalid(String),
    /// Port 0 cannot be sent to.
    #[error("destination port must not be 0")]
    ZeroPort,
}

/// Parses `input` into a socket address.
///
/// # Errors
///
/// Returns [`DestinationError`] when the input is empty, malformed, or names
/// port 0.
///
/// # Examples
///
/// ```rust
/// use chatbox_core::parse_destination;
///
/// let addr = parse_destination("127.0.0.1:9000").unwrap();
/// assert_eq!(addr.port(), 9000);
/// assert!(parse_destination("not an address").is_err());
/// ```
pub fn parse_destination(input: &str) -> Result<SocketAddr, DestinationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DestinationError::Empty);
    }

    let addr = match trimmed.parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(_) => {
            let ip = trimmed
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map_err(|_| DestinationError::Invalid(trimmed.to_string()))?;
            SocketAddr::new(ip, DEFAULT_OSC_PORT)
        }
    };

    if addr.port() == 0 {
        return Err(DestinationError::ZeroPort);
    }
    Ok(addr)
}
