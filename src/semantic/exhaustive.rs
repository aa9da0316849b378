//! Match coverage
//!
//! A match over an enum must name every constructor of the enum exactly
//! once. Arms are fed in textual order; a repeat is reported at its second
//! occurrence, a gap at the match itself.

use crate::utils::{Error, Result, Span};
use log::trace;
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct MatchCoverage<'a> {
    constructors: &'a [String],
    seen: BTreeSet<&'a str>,
}

impl<'a> MatchCoverage<'a> {
    pub fn new(constructors: &'a [String]) -> Self {
        Self { constructors, seen: BTreeSet::new() }
    }

    /// Record an arm naming `ctor`, which the caller has already checked
    /// to be one of the enum's constructors
    pub fn record(&mut self, ctor: &str, span: Span) -> Result<()> {
        let Some(known) = self.constructors.iter().find(|c| c.as_str() == ctor) else {
            return Ok(());
        };
        if !self.seen.insert(known.as_str()) {
            return Err(Error::RepeatedConstructor { span });
        }
        Ok(())
    }

    pub fn missing(&self) -> Vec<&'a str> {
        self.constructors
            .iter()
            .map(String::as_str)
            .filter(|c| !self.seen.contains(c))
            .collect()
    }

    pub fn finish(self, match_span: Span) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        trace!("match at {}:{} misses {:?}", match_span.line, match_span.column, missing);
        Err(Error::NonExhaustiveMatch { span: match_span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;

    fn ctors() -> Vec<String> {
        vec!["Some".to_string(), "None".to_string()]
    }

    fn at(line: u32) -> Span {
        Span::new(0, 1, line, 3, 0)
    }

    fn check(arms: &[&str]) -> Result<()> {
        let ctors = ctors();
        let mut coverage = MatchCoverage::new(&ctors);
        for (i, arm) in arms.iter().enumerate() {
            coverage.record(arm, at(i as u32 + 2))?;
        }
        coverage.finish(at(1))
    }

    #[test]
    fn exact_cover_in_any_order() {
        assert!(check(&["Some", "None"]).is_ok());
        assert!(check(&["None", "Some"]).is_ok());
    }

    #[test]
    fn missing_constructor_reported_at_match() {
        let err = check(&["Some"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonExhaustiveMatch);
        assert_eq!(err.span().unwrap().line, 1);
        assert_eq!(err.to_string(), "switch statement is not exhaustive");
    }

    #[test]
    fn repeat_reported_at_second_occurrence() {
        let err = check(&["None", "Some", "None"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RepeatedConstructor);
        assert_eq!(err.span().unwrap().line, 4);
    }

    #[test]
    fn repeat_wins_over_gap() {
        let err = check(&["Some", "Some"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RepeatedConstructor);
    }
}
