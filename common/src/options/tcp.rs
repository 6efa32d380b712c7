use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// TCP header flags used to craft custom probes (`--scanflags`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TcpFlag {
    /// No flag bit at all.
    Null,
    Fin,
    Syn,
    Rst,
    Psh,
    Ack,
    Urg,
    Ece,
    Cwr,
}

impl TcpFlag {
    pub fn bit(&self) -> u8 {
        match self {
            TcpFlag::Null => 0,
            TcpFlag::Fin => 1,
            TcpFlag::Syn => 2,
            TcpFlag::Rst => 4,
            TcpFlag::Psh => 8,
            TcpFlag::Ack => 16,
            TcpFlag::Urg => 32,
            TcpFlag::Ece => 64,
            TcpFlag::Cwr => 128,
        }
    }
}

/// Combined `--scanflags` value: the decimal sum of every flag bit.
pub fn flags_mask(flags: &BTreeSet<TcpFlag>) -> u8 {
    flags.iter().fold(0, |mask, flag| mask | flag.bit())
}

impl FromStr for TcpFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NULL" | "NONE" => Ok(TcpFlag::Null),
            "FIN" => Ok(TcpFlag::Fin),
            "SYN" => Ok(TcpFlag::Syn),
            "RST" => Ok(TcpFlag::Rst),
            "PSH" => Ok(TcpFlag::Psh),
            "ACK" => Ok(TcpFlag::Ack),
            "URG" => Ok(TcpFlag::Urg),
            "ECE" => Ok(TcpFlag::Ece),
            "CWR" => Ok(TcpFlag::Cwr),
            other => Err(format!("unknown TCP flag '{other}'")),
        }
    }
}

impl fmt::Display for TcpFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The TCP scan technique; the scanner accepts at most one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcpScanTechnique {
    Syn,
    Connect,
    Ack,
    Window,
    Maimon,
    Null,
    Fin,
    Xmas,
}

impl TcpScanTechnique {
    pub fn as_arg(&self) -> &'static str {
        match self {
            TcpScanTechnique::Syn => "-sS",
            TcpScanTechnique::Connect => "-sT",
            TcpScanTechnique::Ack => "-sA",
            TcpScanTechnique::Window => "-sW",
            TcpScanTechnique::Maimon => "-sM",
            TcpScanTechnique::Null => "-sN",
            TcpScanTechnique::Fin => "-sF",
            TcpScanTechnique::Xmas => "-sX",
        }
    }

    /// Every technique except a plain connect() scan needs raw sockets.
    pub fn needs_raw_sockets(&self) -> bool {
        !matches!(self, TcpScanTechnique::Connect)
    }
}

impl FromStr for TcpScanTechnique {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "syn" => Ok(TcpScanTechnique::Syn),
            "connect" => Ok(TcpScanTechnique::Connect),
            "ack" => Ok(TcpScanTechnique::Ack),
            "window" => Ok(TcpScanTechnique::Window),
            "maimon" => Ok(TcpScanTechnique::Maimon),
            "null" => Ok(TcpScanTechnique::Null),
            "fin" => Ok(TcpScanTechnique::Fin),
            "xmas" => Ok(TcpScanTechnique::Xmas),
            other => Err(format!("unknown TCP scan technique '{other}'")),
        }
    }
}
