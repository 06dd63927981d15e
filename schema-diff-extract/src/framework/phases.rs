use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Tables,
    Columns,
    Constraints,
    Indexes,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Tables, Phase::Columns, Phase::Constraints, Phase::Indexes];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Tables => "Tables",
            Phase::Columns => "Columns",
            Phase::Constraints => "Constraints",
            Phase::Indexes => "Indexes",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
