//! Symbol Filter (spec §4.2): include/exclude regex and binding predicates.

use std::collections::HashSet;

use regex::Regex;
use xcover_common::Binding;

use crate::error::CoreError;

/// Compiled filter predicate, applied once per symbol.
///
/// Evaluation order (spec §4.2):
/// 1. `exclude_bindings` non-empty and matches -> exclude.
/// 2. `include_bindings` non-empty -> include iff matches, else exclude.
/// 3. `exclude_regex` matches name -> exclude.
/// 4. `include_regex` non-empty -> include iff matches, else exclude.
/// 5. otherwise -> include.
#[derive(Debug, Default)]
pub struct SymbolFilter {
    include_regex: Option<Regex>,
    exclude_regex: Option<Regex>,
    include_bindings: HashSet<Binding>,
    exclude_bindings: HashSet<Binding>,
}

impl SymbolFilter {
    pub fn builder() -> SymbolFilterBuilder {
        SymbolFilterBuilder::default()
    }

    pub fn matches(&self, name: &str, binding: Binding) -> bool {
        if !self.exclude_bindings.is_empty() && self.exclude_bindings.contains(&binding) {
            return false;
        }
        if !self.include_bindings.is_empty() {
            return self.include_bindings.contains(&binding);
        }
        if let Some(re) = &self.exclude_regex {
            if re.is_match(name) {
                return false;
            }
        }
        if let Some(re) = &self.include_regex {
            return re.is_match(name);
        }
        true
    }
}

/// Named-argument-style constructor for [`SymbolFilter`] (spec §9: "options
/// bag" pattern translated to a plain builder, no dynamic dispatch needed).
#[derive(Debug, Default)]
pub struct SymbolFilterBuilder {
    include_pattern: Option<String>,
    exclude_pattern: Option<String>,
    include_bindings: HashSet<Binding>,
    exclude_bindings: HashSet<Binding>,
}

impl SymbolFilterBuilder {
    pub fn include_pattern(mut self, pattern: impl Into<Option<String>>) -> Self {
        self.include_pattern = pattern.into();
        self
    }

    pub fn exclude_pattern(mut self, pattern: impl Into<Option<String>>) -> Self {
        self.exclude_pattern = pattern.into();
        self
    }

    pub fn include_bindings(mut self, bindings: impl IntoIterator<Item = Binding>) -> Self {
        self.include_bindings = bindings.into_iter().collect();
        self
    }

    pub fn exclude_bindings(mut self, bindings: impl IntoIterator<Item = Binding>) -> Self {
        self.exclude_bindings = bindings.into_iter().collect();
        self
    }

    /// Compiles the regular expressions, failing at initialisation time
    /// rather than per-symbol (spec §4.2).
    pub fn build(self) -> Result<SymbolFilter, CoreError> {
        let include_regex = self
            .include_pattern
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(&p))
            .transpose()?;
        let exclude_regex = self
            .exclude_pattern
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(&p))
            .transpose()?;

        Ok(SymbolFilter {
            include_regex,
            exclude_regex,
            include_bindings: self.include_bindings,
            exclude_bindings: self.exclude_bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_includes_everything() {
        let filter = SymbolFilter::builder().build().unwrap();
        assert!(filter.matches("anything", Binding::Local));
        assert!(filter.matches("anything", Binding::Global));
        assert!(filter.matches("anything", Binding::Weak));
    }

    #[test]
    fn include_regex_restricts() {
        let filter = SymbolFilter::builder()
            .include_pattern("^a$".to_string())
            .build()
            .unwrap();
        assert!(filter.matches("a", Binding::Local));
        assert!(!filter.matches("b", Binding::Local));
    }

    #[test]
    fn exclude_regex_wins_over_include() {
        // exclude is checked before include in the predicate order.
        let filter = SymbolFilter::builder()
            .include_pattern(".*".to_string())
            .exclude_pattern("^a$".to_string())
            .build()
            .unwrap();
        assert!(!filter.matches("a", Binding::Local));
        assert!(filter.matches("b", Binding::Local));
    }

    #[test]
    fn exclude_all() {
        let filter = SymbolFilter::builder()
            .exclude_pattern(".*".to_string())
            .build()
            .unwrap();
        assert!(!filter.matches("anything", Binding::Local));
    }

    #[test]
    fn binding_exclude_beats_everything() {
        let filter = SymbolFilter::builder()
            .exclude_bindings([Binding::Weak])
            .include_pattern(".*".to_string())
            .build()
            .unwrap();
        assert!(!filter.matches("weak_fn", Binding::Weak));
        assert!(filter.matches("global_fn", Binding::Global));
    }

    #[test]
    fn binding_include_is_exclusive() {
        let filter = SymbolFilter::builder()
            .include_bindings([Binding::Local])
            .build()
            .unwrap();
        assert!(filter.matches("local_fn", Binding::Local));
        assert!(!filter.matches("global_fn", Binding::Global));
    }

    #[test]
    fn invalid_regex_fails_at_build_time() {
        let err = SymbolFilter::builder()
            .include_pattern("(unclosed".to_string())
            .build();
        assert!(err.is_err());
    }
}
