use std::fmt;

/// A non-fatal problem found while generating documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Where the problem was found, e.g. `User.owner` or `GET /users response`.
    pub context: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

/// Collects warnings for one run. Every warning is also logged as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, context: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            context: context.into(),
            message: message.into(),
        };
        tracing::warn!(context = %warning.context, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_keep_arrival_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn("User.owner", "unresolved reference `Person`");
        diagnostics.warn("GET /pets response", "unknown type `file`");

        assert_eq!(diagnostics.len(), 2);
        let rendered: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "User.owner: unresolved reference `Person`",
                "GET /pets response: unknown type `file`",
            ]
        );
    }
}
