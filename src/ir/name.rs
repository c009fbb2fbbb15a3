//! Qualified names: a declaration's identity within a `WyilFile`.

use std::fmt;

/// A dotted path plus a terminal name, e.g. `std::collections::List` would
/// be `QualifiedName { path: ["std", "collections"], name: "List" }`.
///
/// Two `QualifiedName`s are equal iff both the path and the name match
/// exactly; no normalization (case-folding, `.`-vs-`/` separators) happens
/// here, matching the pooled encoding in [`crate::codec::pool`] where a
/// name is just an index into the path pool plus an index into the string
/// pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    path: Vec<String>,
    name: String,
}

impl QualifiedName {
    pub fn new(path: Vec<String>, name: String) -> Self {
        Self { path, name }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path with the name appended, e.g. `["std", "collections", "List"]`.
    pub fn components(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).chain(std::iter::once(self.name.as_str())).collect()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.path {
            write!(f, "{seg}::")?;
        }
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_double_colon() {
        let n = QualifiedName::new(vec!["a".into(), "b".into()], "C".into());
        assert_eq!(n.to_string(), "a::b::C");
    }

    #[test]
    fn equality_is_structural() {
        let a = QualifiedName::new(vec!["a".into()], "X".into());
        let b = QualifiedName::new(vec!["a".into()], "X".into());
        assert_eq!(a, b);
    }
}
