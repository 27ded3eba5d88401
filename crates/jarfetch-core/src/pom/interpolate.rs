//! `${name}` placeholder substitution.
//!
//! Tolerant: unknown names are left as literal text and reported to the
//! caller, which turns them into warnings.

use std::collections::{BTreeMap, BTreeSet};

/// Substitution stops after this many passes; guards `a=${b}`, `b=${a}`.
const MAX_PASSES: usize = 8;

pub(crate) struct Interpolator<'a> {
    properties: &'a BTreeMap<String, String>,
}

impl<'a> Interpolator<'a> {
    pub fn new(properties: &'a BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    /// Substitute until nothing changes. Names still unresolved afterwards are
    /// added to `missing`.
    pub fn interpolate(&self, input: &str, missing: &mut BTreeSet<String>) -> String {
        let mut current = input.to_string();
        for _ in 0..MAX_PASSES {
            if !current.contains("${") {
                return current;
            }
            let (next, changed) = self.pass(&current);
            current = next;
            if !changed {
                break;
            }
        }
        collect_placeholders(&current, missing);
        current
    }

    pub fn interpolate_opt(&self, input: Option<&str>, missing: &mut BTreeSet<String>) -> Option<String> {
        input.map(|s| self.interpolate(s, missing))
    }

    fn pass(&self, input: &str) -> (String, bool) {
        let mut out = String::with_capacity(input.len());
        let mut changed = false;
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = after[..end].trim();
                    match self.properties.get(name) {
                        Some(value) => {
                            out.push_str(value);
                            changed = true;
                        }
                        None => {
                            out.push_str("${");
                            out.push_str(&after[..end]);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        (out, changed)
    }
}

fn collect_placeholders(text: &str, missing: &mut BTreeSet<String>) {
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                missing.insert(after[..end].trim().to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_properties() {
        let p = props(&[("major", "2"), ("ver", "${major}.0"), ("full", "v${ver}")]);
        let mut missing = BTreeSet::new();
        assert_eq!(Interpolator::new(&p).interpolate("${full}-final", &mut missing), "v2.0-final");
        assert!(missing.is_empty());
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        let p = props(&[("a", "1")]);
        let mut missing = BTreeSet::new();
        let out = Interpolator::new(&p).interpolate("${a}.${nope}.${a}", &mut missing);
        assert_eq!(out, "1.${nope}.1");
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["nope"]);
    }

    #[test]
    fn self_reference_terminates() {
        let p = props(&[("a", "${b}"), ("b", "${a}")]);
        let mut missing = BTreeSet::new();
        let out = Interpolator::new(&p).interpolate("${a}", &mut missing);
        assert!(out == "${a}" || out == "${b}");
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let p = props(&[("a", "1")]);
        let mut missing = BTreeSet::new();
        assert_eq!(Interpolator::new(&p).interpolate("x${a", &mut missing), "x${a");
        assert!(missing.is_empty());
    }
}
