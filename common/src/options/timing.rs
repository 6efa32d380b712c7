use std::fmt;
use std::str::FromStr;

/// Named presets for scan aggressiveness, rendered as `-T0` to `-T5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimingTemplate {
    /// Paranoid: serialised probes, five minutes apart.
    Slowest,
    Sneaky,
    Polite,
    Normal,
    Aggressive,
    /// Insane: assumes an extraordinarily fast network.
    Fastest,
}

impl TimingTemplate {
    pub fn level(&self) -> u8 {
        match self {
            TimingTemplate::Slowest => 0,
            TimingTemplate::Sneaky => 1,
            TimingTemplate::Polite => 2,
            TimingTemplate::Normal => 3,
            TimingTemplate::Aggressive => 4,
            TimingTemplate::Fastest => 5,
        }
    }

    pub fn as_arg(&self) -> String {
        format!("-T{}", self.level())
    }
}

impl FromStr for TimingTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "slowest" | "paranoid" => Ok(TimingTemplate::Slowest),
            "1" | "sneaky" => Ok(TimingTemplate::Sneaky),
            "2" | "polite" => Ok(TimingTemplate::Polite),
            "3" | "normal" => Ok(TimingTemplate::Normal),
            "4" | "aggressive" => Ok(TimingTemplate::Aggressive),
            "5" | "fastest" | "insane" => Ok(TimingTemplate::Fastest),
            other => Err(format!("unknown timing template '{other}'")),
        }
    }
}

impl fmt::Display for TimingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimingTemplate::Slowest => "slowest",
            TimingTemplate::Sneaky => "sneaky",
            TimingTemplate::Polite => "polite",
            TimingTemplate::Normal => "normal",
            TimingTemplate::Aggressive => "aggressive",
            TimingTemplate::Fastest => "fastest",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_the_same_level() {
        assert_eq!("insane".parse(), Ok(TimingTemplate::Fastest));
        assert_eq!("PARANOID".parse(), Ok(TimingTemplate::Slowest));
        assert_eq!(TimingTemplate::Fastest.as_arg(), "-T5");
        assert!("warp".parse::<TimingTemplate>().is_err());
    }
}
