use crate::parse::Segment;

/// What a command sees of the unit it is running for.
#[derive(Debug)]
pub struct CommandContext<'a> {
    /// The unit's text as typed, operator excluded.
    pub raw: &'a str,
    /// The command word, after alias lookup has already happened.
    pub name: &'a str,
    /// All words including the command word, quotes removed.
    pub words: Vec<&'a str>,
}

impl<'a> CommandContext<'a> {
    pub fn from_segment(segment: &'a Segment) -> Self {
        let words: Vec<&str> = segment.words.iter().map(|w| w.text.as_str()).collect();
        Self {
            raw: segment.original.as_str(),
            name: words.first().copied().unwrap_or_default(),
            words,
        }
    }

    /// Words after the command word.
    pub fn args(&self) -> &[&'a str] {
        self.words.get(1..).unwrap_or_default()
    }

    /// Check if any argument matches a flag.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args().contains(&flag)
    }

    /// Check if any argument matches any of the given flags.
    pub fn has_any_flag(&self, flags: &[&str]) -> bool {
        self.args().iter().any(|w| flags.contains(w))
    }

    /// Arguments that are not flags. A lone `-` counts as an operand.
    pub fn operands(&self) -> Vec<&'a str> {
        self.args()
            .iter()
            .copied()
            .filter(|w| *w == "-" || !w.starts_with('-'))
            .collect()
    }
}
