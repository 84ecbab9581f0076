// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Field-value matching.
//!
//! Resolves caller-supplied keys onto extracted fields through five layers,
//! cheapest and most precise first:
//!
//! 1. exact equality against element id, name, identifier
//! 2. case-insensitive equality against the same keys
//! 3. bidirectional substring containment (id, name, identifier, placeholder),
//!    shortest matching field key wins
//! 4. a fixed concept table (`e-mail` and `email_address` both mean email)
//! 5. bounded edit distance: `distance <= max(len) / 3`, field keys longer
//!    than two characters
//!
//! The first layer producing a hit decides. Equal-quality hits from
//! different supplied keys are reported as [`MatchAmbiguous`] and the field
//! stays unmatched.

use crate::error::MatchAmbiguous;
use crate::types::{FieldData, FieldDescriptor, FormDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum length of the contained side in a containment match.
const MIN_CONTAINED_LEN: usize = 3;

const CONCEPTS: &[(&str, &[&str])] = &[
    ("email", &["email", "e-mail", "mail", "email_address"]),
    ("name", &["name", "full_name", "fullname", "username"]),
    ("first_name", &["first_name", "firstname", "fname"]),
    ("last_name", &["last_name", "lastname", "lname"]),
    ("phone", &["phone", "telephone", "mobile", "phone_number"]),
    ("message", &["message", "comment", "comments", "description"]),
    ("subject", &["subject", "title", "topic"]),
];

/// Which layer produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLayer {
    Exact,
    CaseInsensitive,
    Containment,
    Concept,
    EditDistance,
}

impl MatchLayer {
    /// Exact and case-insensitive hits claim their key for the whole form.
    fn is_strict(&self) -> bool {
        matches!(self, MatchLayer::Exact | MatchLayer::CaseInsensitive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    /// The supplied key that matched.
    pub key: String,
    pub value: String,
    pub layer: MatchLayer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(FieldMatch),
    Ambiguous(MatchAmbiguous),
    NoMatch,
}

/// Resolve one field against the supplied data.
pub fn match_field(field: &FieldDescriptor, data: &FieldData) -> MatchOutcome {
    match_excluding(field, data, &HashSet::new())
}

/// Resolution of a whole form.
#[derive(Debug, Clone, Default)]
pub struct FormBinding {
    /// Matches indexed like `form.fields`.
    pub matches: Vec<Option<FieldMatch>>,
    /// One line per ambiguous field.
    pub warnings: Vec<String>,
}

impl FormBinding {
    pub fn matched_keys(&self) -> HashSet<&str> {
        self.matches
            .iter()
            .flatten()
            .map(|m| m.key.as_str())
            .collect()
    }

    pub fn matched_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_some()).count()
    }
}

/// Resolve every field of a form.
///
/// Keys claimed by an exact or case-insensitive match are withheld from the
/// fuzzier layers of other fields, so `{"email": ..}` binds `email` and
/// leaves `user_email` alone. Radio groups share a name, so a strict key may
/// bind several fields.
pub fn bind_form(form: &FormDescriptor, data: &FieldData) -> FormBinding {
    let mut binding = FormBinding {
        matches: vec![None; form.fields.len()],
        warnings: Vec::new(),
    };

    let mut reserved: HashSet<String> = HashSet::new();
    for (i, field) in form.fields.iter().enumerate() {
        if let Some(m) = strict_match(field, data) {
            reserved.insert(m.key.clone());
            binding.matches[i] = Some(m);
        }
    }

    let reserved_refs: HashSet<&str> = reserved.iter().map(String::as_str).collect();
    for (i, field) in form.fields.iter().enumerate() {
        if binding.matches[i].is_some() {
            continue;
        }
        match match_excluding(field, data, &reserved_refs) {
            MatchOutcome::Matched(m) => binding.matches[i] = Some(m),
            MatchOutcome::Ambiguous(a) => {
                tracing::debug!(field = %a.field, "ambiguous match");
                binding.warnings.push(a.to_string());
            }
            MatchOutcome::NoMatch => {}
        }
    }
    binding
}

fn strict_match(field: &FieldDescriptor, data: &FieldData) -> Option<FieldMatch> {
    match match_excluding(field, data, &HashSet::new()) {
        MatchOutcome::Matched(m) if m.layer.is_strict() => Some(m),
        _ => None,
    }
}

fn match_excluding(
    field: &FieldDescriptor,
    data: &FieldData,
    excluded: &HashSet<&str>,
) -> MatchOutcome {
    let keys: Vec<&str> = data
        .keys()
        .map(String::as_str)
        .filter(|k| !excluded.contains(k))
        .collect();
    if keys.is_empty() {
        return MatchOutcome::NoMatch;
    }

    let hit = |key: &str, layer: MatchLayer| {
        MatchOutcome::Matched(FieldMatch {
            key: key.to_string(),
            value: data.get(key).cloned().unwrap_or_default(),
            layer,
        })
    };
    let decide = |mut candidates: Vec<&str>, layer: MatchLayer| {
        candidates.sort_unstable();
        candidates.dedup();
        match candidates.len() {
            0 => None,
            1 => Some(hit(candidates[0], layer)),
            _ => Some(MatchOutcome::Ambiguous(MatchAmbiguous {
                field: field.identifier.clone(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            })),
        }
    };

    let primary = field.primary_keys();

    // 1. exact
    for fk in &primary {
        if keys.contains(fk) {
            return hit(fk, MatchLayer::Exact);
        }
    }

    // 2. case-insensitive
    for fk in &primary {
        let fk_lower = fk.to_lowercase();
        let candidates: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| k.to_lowercase() == fk_lower)
            .collect();
        if let Some(outcome) = decide(candidates, MatchLayer::CaseInsensitive) {
            return outcome;
        }
    }

    // 3. containment, shortest field key wins
    let containment: Vec<String> = field
        .containment_keys()
        .iter()
        .map(|k| k.to_lowercase())
        .collect();
    let mut best: Option<(usize, Vec<&str>)> = None;
    for &k in &keys {
        let k_lower = k.to_lowercase();
        for fk in &containment {
            if !contains_either(&k_lower, fk) {
                continue;
            }
            let len = fk.chars().count();
            keep_best(&mut best, len, k);
        }
    }
    if let Some((_, candidates)) = best {
        if let Some(outcome) = decide(candidates, MatchLayer::Containment) {
            return outcome;
        }
    }

    // 4. concept table
    let field_concepts: HashSet<&str> = containment.iter().filter_map(|k| concept_of(k)).collect();
    if !field_concepts.is_empty() {
        let candidates: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| concept_of(&k.to_lowercase()).is_some_and(|c| field_concepts.contains(c)))
            .collect();
        if let Some(outcome) = decide(candidates, MatchLayer::Concept) {
            return outcome;
        }
    }

    // 5. edit distance
    let mut best: Option<(usize, Vec<&str>)> = None;
    for &k in &keys {
        let k_lower = k.to_lowercase();
        for fk in &primary {
            let Some(d) = bounded_distance(&k_lower, &fk.to_lowercase()) else {
                continue;
            };
            keep_best(&mut best, d, k);
        }
    }
    if let Some((_, candidates)) = best {
        if let Some(outcome) = decide(candidates, MatchLayer::EditDistance) {
            return outcome;
        }
    }

    MatchOutcome::NoMatch
}

/// Track the candidates with the lowest rank seen so far.
fn keep_best<'a>(best: &mut Option<(usize, Vec<&'a str>)>, rank: usize, key: &'a str) {
    match best {
        Some((r, keys)) if *r == rank => keys.push(key),
        Some((r, _)) if *r < rank => {}
        _ => *best = Some((rank, vec![key])),
    }
}

fn contains_either(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    shorter.chars().count() >= MIN_CONTAINED_LEN && longer.contains(shorter)
}

/// Concept bucket of a lowercased key.
pub fn concept_of(key: &str) -> Option<&'static str> {
    CONCEPTS
        .iter()
        .find(|(_, members)| members.contains(&key))
        .map(|(concept, _)| *concept)
}

/// Distance between a supplied key and a field key when it falls within
/// the acceptance bound, else `None`.
pub fn bounded_distance(supplied: &str, field_key: &str) -> Option<usize> {
    let field_len = field_key.chars().count();
    if field_len <= 2 {
        return None;
    }
    let limit = supplied.chars().count().max(field_len) / 3;
    let d = edit_distance(supplied, field_key);
    (d <= limit).then_some(d)
}

/// Classic dynamic-programming Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest field key for an unrecognized supplied key: exact, then
/// shortest containment, then smallest bounded edit distance.
pub fn closest_key<'a>(supplied: &str, field_keys: &[&'a str]) -> Option<&'a str> {
    let s = supplied.to_lowercase();
    if let Some(k) = field_keys.iter().copied().find(|k| k.to_lowercase() == s) {
        return Some(k);
    }
    if let Some(k) = field_keys
        .iter()
        .copied()
        .filter(|k| contains_either(&s, &k.to_lowercase()))
        .min_by_key(|k| k.len())
    {
        return Some(k);
    }
    field_keys
        .iter()
        .copied()
        .filter_map(|k| bounded_distance(&s, &k.to_lowercase()).map(|d| (d, k)))
        .min_by_key(|(d, _)| *d)
        .map(|(_, k)| k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldConstraints, FieldTag, FormMethod, InputType};

    fn field(id: Option<&str>, name: Option<&str>, placeholder: Option<&str>) -> FieldDescriptor {
        FieldDescriptor {
            position: 0,
            tag: FieldTag::Input,
            input_type: InputType::Text,
            name: name.map(str::to_string),
            element_id: id.map(str::to_string),
            identifier: id.or(name).unwrap_or("field_0").to_string(),
            label: String::new(),
            placeholder: placeholder.map(str::to_string),
            value: None,
            checked: false,
            required: false,
            disabled: false,
            readonly: false,
            constraints: FieldConstraints::default(),
            options: Vec::new(),
        }
    }

    fn data(pairs: &[(&str, &str)]) -> FieldData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn matched(outcome: MatchOutcome) -> FieldMatch {
        match outcome {
            MatchOutcome::Matched(m) => m,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_prefers_id_then_name() {
        let f = field(Some("contact_email"), Some("email"), None);
        let m = matched(match_field(&f, &data(&[("email", "a"), ("contact_email", "b")])));
        assert_eq!(m.key, "contact_email");
        assert_eq!(m.layer, MatchLayer::Exact);
    }

    #[test]
    fn test_case_insensitive() {
        let f = field(None, Some("Email"), None);
        let m = matched(match_field(&f, &data(&[("EMAIL", "x@y.z")])));
        assert_eq!(m.layer, MatchLayer::CaseInsensitive);
        assert_eq!(m.value, "x@y.z");
    }

    #[test]
    fn test_containment_prefers_shortest_field_key() {
        let f = field(Some("input_user_email_primary"), Some("email"), None);
        let m = matched(match_field(&f, &data(&[("user_email", "v")])));
        assert_eq!(m.layer, MatchLayer::Containment);
    }

    #[test]
    fn test_containment_ignores_tiny_keys() {
        let f = field(None, Some("address"), None);
        assert_eq!(match_field(&f, &data(&[("ad", "v")])), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_concept_table() {
        let f = field(None, Some("e-mail"), None);
        let m = matched(match_field(&f, &data(&[("mail", "v")])));
        // "mail" is contained in "e-mail"
        assert_eq!(m.layer, MatchLayer::Containment);

        let f = field(None, Some("mobile"), None);
        let m = matched(match_field(&f, &data(&[("phone", "555")])));
        assert_eq!(m.layer, MatchLayer::Concept);

        let f = field(None, Some("comments"), None);
        let m = matched(match_field(&f, &data(&[("description", "hi")])));
        assert_eq!(m.layer, MatchLayer::Concept);
    }

    #[test]
    fn test_edit_distance_layer() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(bounded_distance("phon", "phone"), Some(1));
        assert_eq!(bounded_distance("phon", "telephone"), None);
        assert_eq!(bounded_distance("ab", "ax"), None);

        let f = field(None, Some("adress"), None);
        let m = matched(match_field(&f, &data(&[("address", "1 Main St")])));
        assert_eq!(m.layer, MatchLayer::EditDistance);
    }

    #[test]
    fn test_ambiguous_containment() {
        let f = field(None, Some("email"), None);
        match match_field(&f, &data(&[("home_email", "a"), ("work_email", "b")])) {
            MatchOutcome::Ambiguous(a) => {
                assert_eq!(a.field, "email");
                assert_eq!(a.candidates, vec!["home_email", "work_email"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_no_match() {
        let f = field(None, Some("company"), None);
        assert_eq!(match_field(&f, &data(&[("zip", "1")])), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_exact_key_not_reused_by_fuzzy_field() {
        let form = FormDescriptor {
            index: 0,
            id: None,
            name: None,
            action: "https://example.com/".into(),
            method: FormMethod::Post,
            enctype: "application/x-www-form-urlencoded".into(),
            fields: vec![
                field(None, Some("user_email"), None),
                field(None, Some("email"), None),
            ],
            hidden_fields: Vec::new(),
            submit_controls: Vec::new(),
        };
        let binding = bind_form(&form, &data(&[("email", "a@b.c")]));
        assert!(binding.matches[0].is_none());
        assert_eq!(binding.matches[1].as_ref().map(|m| m.key.as_str()), Some("email"));
        assert_eq!(binding.matched_count(), 1);
    }

    #[test]
    fn test_closest_key() {
        let keys = ["email", "phone", "message"];
        assert_eq!(closest_key("Email", &keys), Some("email"));
        assert_eq!(closest_key("phon", &keys), Some("phone"));
        assert_eq!(closest_key("mesage", &keys), Some("message"));
        assert_eq!(closest_key("zzz", &keys), None);
    }
}
