use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// A configuration problem found while interpreting constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    /// Id of the constraint being unpacked when the problem was found.
    pub constraint: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
        };
        match &self.constraint {
            Some(id) => write!(f, "{level}: {} (constraint {id})", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}
