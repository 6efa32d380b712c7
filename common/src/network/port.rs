//! Port specifications as accepted by the scanner's `-p` option.

use std::fmt;
use std::str::FromStr;

/// Restricts a port item to one transport protocol (`T:`, `U:`, `S:` prefixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortScope {
    Tcp,
    Udp,
    Sctp,
}

impl PortScope {
    fn prefix(&self) -> &'static str {
        match self {
            PortScope::Tcp => "T:",
            PortScope::Udp => "U:",
            PortScope::Sctp => "S:",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortItem {
    Single(u16),
    Range { start: u16, end: u16 },
    /// A service name from the scanner's services database, e.g. `http`.
    Service(String),
}

/// One comma-free port item, optionally scoped to a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub scope: Option<PortScope>,
    pub item: PortItem,
}

impl PortSpec {
    pub fn single(port: u16) -> Self {
        Self {
            scope: None,
            item: PortItem::Single(port),
        }
    }

    pub fn range(start: u16, end: u16) -> Self {
        Self {
            scope: None,
            item: PortItem::Range { start, end },
        }
    }

    pub fn with_scope(mut self, scope: PortScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Parses a comma separated list such as `22,80-90,U:53`.
    pub fn parse_list(s: &str) -> Result<Vec<PortSpec>, String> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PortSpec::from_str)
            .collect()
    }
}

impl FromStr for PortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scope, body) = match s.split_once(':') {
            Some(("T", body)) => (Some(PortScope::Tcp), body),
            Some(("U", body)) => (Some(PortScope::Udp), body),
            Some(("S", body)) => (Some(PortScope::Sctp), body),
            Some((prefix, _)) => return Err(format!("unknown protocol prefix '{prefix}:' in '{s}'")),
            None => (None, s),
        };

        if body.is_empty() {
            return Err(format!("empty port in '{s}'"));
        }

        let item = if body.chars().all(|c| c.is_ascii_digit() || c == '-') {
            parse_numeric(body)?
        } else if is_service_name(body) {
            PortItem::Service(body.to_string())
        } else {
            return Err(format!("invalid port '{s}'"));
        };

        Ok(Self { scope, item })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = self.scope {
            write!(f, "{}", scope.prefix())?;
        }
        match &self.item {
            PortItem::Single(port) => write!(f, "{port}"),
            PortItem::Range { start, end } => write!(f, "{start}-{end}"),
            PortItem::Service(name) => write!(f, "{name}"),
        }
    }
}

fn parse_numeric(body: &str) -> Result<PortItem, String> {
    let parse = |value: &str| {
        value
            .parse::<u16>()
            .map_err(|e| format!("invalid port number '{value}': {e}"))
    };

    match body.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(format!("port range {start}-{end} is reversed"));
            }
            Ok(PortItem::Range { start, end })
        }
        None => Ok(PortItem::Single(parse(body)?)),
    }
}

fn is_service_name(body: &str) -> bool {
    body.starts_with(|c: char| c.is_ascii_alphabetic() || c == '*')
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*' | '?' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_ranges_and_services() {
        assert_eq!(PortSpec::from_str("8976"), Ok(PortSpec::single(8976)));
        assert_eq!(PortSpec::from_str("1-1024"), Ok(PortSpec::range(1, 1024)));
        assert_eq!(
            PortSpec::from_str("U:53"),
            Ok(PortSpec::single(53).with_scope(PortScope::Udp))
        );
        assert!(matches!(
            PortSpec::from_str("http"),
            Ok(PortSpec { item: PortItem::Service(_), .. })
        ));
    }

    #[test]
    fn rejects_malformed_ports() {
        for raw in ["", "65536", "90-80", "1-2-3", "X:80", "-p", "80 443", "-80"] {
            assert!(PortSpec::from_str(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn list_round_trips_through_display() {
        let specs = PortSpec::parse_list("22, 80-90,T:443").unwrap();
        let rendered: Vec<String> = specs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["22", "80-90", "T:443"]);
    }
}
