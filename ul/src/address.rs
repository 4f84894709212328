//! Compound addressing of application entities:
//! the `AET@host:port` form used to name C-MOVE destinations
//! and remote nodes in configuration.

use snafu::{Backtrace, OptionExt, Snafu};
use std::fmt;
use std::str::FromStr;

/// An error parsing a full application entity address.
#[derive(Debug, Snafu)]
#[snafu(display("invalid application entity address `{}`", value))]
pub struct ParseAeAddressError {
    value: String,
    backtrace: Backtrace,
}

/// A full application entity address:
/// an AE title plus the socket address where it listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullAeAddr {
    ae_title: String,
    socket_addr: String,
}

impl FullAeAddr {
    /// Compose an address from its parts.
    pub fn new(ae_title: impl Into<String>, socket_addr: impl Into<String>) -> Self {
        FullAeAddr {
            ae_title: ae_title.into(),
            socket_addr: socket_addr.into(),
        }
    }

    /// The application entity title.
    pub fn ae_title(&self) -> &str {
        &self.ae_title
    }

    /// The `host:port` part.
    pub fn socket_addr(&self) -> &str {
        &self.socket_addr
    }
}

/// Parse from the `AET@host:port` form.
impl FromStr for FullAeAddr {
    type Err = ParseAeAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let at = s.find('@').context(ParseAeAddressSnafu { value: s })?;
        let (ae_title, rest) = (&s[..at], &s[at + 1..]);
        snafu::ensure!(
            !ae_title.is_empty() && rest.contains(':'),
            ParseAeAddressSnafu { value: s }
        );
        Ok(FullAeAddr {
            ae_title: ae_title.to_string(),
            socket_addr: rest.to_string(),
        })
    }
}

impl fmt::Display for FullAeAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.ae_title, self.socket_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::FullAeAddr;

    #[test]
    fn parse_and_display() {
        let addr: FullAeAddr = "STORE-SCP@192.168.1.10:104".parse().unwrap();
        assert_eq!(addr.ae_title(), "STORE-SCP");
        assert_eq!(addr.socket_addr(), "192.168.1.10:104");
        assert_eq!(addr.to_string(), "STORE-SCP@192.168.1.10:104");
    }

    #[test]
    fn rejects_incomplete_forms() {
        assert!("STORE-SCP".parse::<FullAeAddr>().is_err());
        assert!("@host:104".parse::<FullAeAddr>().is_err());
        assert!("SCP@host".parse::<FullAeAddr>().is_err());
    }
}
