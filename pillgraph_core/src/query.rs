//! Query surface: name-based point lookups and fuzzy effect search.
//!
//! Lookups resolve through the same canonical keys the merge engine writes,
//! so an exact key match and a case-insensitive name scan coincide. Search
//! scores effects with Jaro-Winkler similarity over the name and description,
//! tolerating typos and partial words.

use crate::types::{canonical_key, Effect, Ingredient, MedGraph, Medication};

/// Configuration for fuzzy effect search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum score for a match to be returned (0.0 permissive, 1.0 exact).
    pub threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { threshold: 0.72 }
    }
}

/// A scored search hit.
#[derive(Debug, Clone)]
pub struct EffectMatch {
    pub effect: Effect,
    pub score: f32,
}

/// Search failures that are the caller's fault, distinct from "no results".
#[derive(Debug, PartialEq, Eq)]
pub enum SearchError {
    /// The query was empty or whitespace-only.
    EmptyQuery,
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::EmptyQuery => f.write_str("search query must not be empty"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Look up a medication by name. Trims the input; identity is case-insensitive.
pub fn get_medication<'a>(graph: &'a MedGraph, name: &str) -> Option<&'a Medication> {
    graph.medications.get(&canonical_key(name))
}

/// Look up an ingredient by name.
pub fn get_ingredient<'a>(graph: &'a MedGraph, name: &str) -> Option<&'a Ingredient> {
    graph.ingredients.get(&canonical_key(name))
}

/// Look up an effect by name.
pub fn get_effect<'a>(graph: &'a MedGraph, name: &str) -> Option<&'a Effect> {
    graph.effects.get(&canonical_key(name))
}

/// Fuzzy-search effects by name and description, ranked by relevance.
///
/// Name matches outrank description matches; results below
/// `config.threshold` are dropped. An empty query is a caller error,
/// distinct from an empty result list.
pub fn search_effects(
    graph: &MedGraph,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<EffectMatch>, SearchError> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let mut matches: Vec<EffectMatch> = graph
        .effects
        .values()
        .filter_map(|effect| {
            let name_score = score_text(&query, &effect.name);
            let desc_score = effect
                .description
                .as_deref()
                .map(|d| score_text(&query, d))
                .unwrap_or(0.0);
            // Description hits are discounted so name hits rank first.
            let score = name_score.max(desc_score * 0.85);
            if score >= config.threshold {
                Some(EffectMatch {
                    effect: effect.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(matches)
}

/// Score a lowercased query against a text field.
///
/// Takes the best of whole-field similarity and per-token similarity so that
/// a partial word ("head") still matches a longer field ("Severe headache").
fn score_text(query: &str, text: &str) -> f32 {
    let text = text.to_lowercase();
    let mut best = strsim::jaro_winkler(query, &text) as f32;
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() {
            continue;
        }
        let score = strsim::jaro_winkler(query, token) as f32;
        if score > best {
            best = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_fragment;
    use crate::types::GraphFragment;

    fn graph_with_effects() -> MedGraph {
        let mut graph = MedGraph::default();
        let fragment: GraphFragment = serde_json::from_str(
            r#"{"effects":{
                "e1":{"name":"Headache","medicationsTreatingIt":["Advil"]},
                "e2":{"name":"Nausea","medicationsCausingIt":["Advil"],
                      "description":"Feeling of sickness in the stomach."},
                "e3":{"name":"Drowsiness"}}}"#,
        )
        .unwrap();
        merge_fragment(&mut graph, &fragment);
        graph
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let graph = graph_with_effects();
        assert!(get_effect(&graph, "HEADACHE").is_some());
        assert!(get_effect(&graph, " headache ").is_some());
        assert!(get_effect(&graph, "vertigo").is_none());
        assert!(get_medication(&graph, "Advil").is_none());
    }

    #[test]
    fn partial_word_matches_effect_name() {
        let graph = graph_with_effects();
        let results = search_effects(&graph, "head", &SearchConfig::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].effect.name, "Headache");
    }

    #[test]
    fn typo_still_matches() {
        let graph = graph_with_effects();
        let results = search_effects(&graph, "headace", &SearchConfig::default()).unwrap();
        assert!(results.iter().any(|m| m.effect.name == "Headache"));
    }

    #[test]
    fn description_tokens_match_but_rank_below_name_hits() {
        let graph = graph_with_effects();
        let results = search_effects(&graph, "stomach", &SearchConfig::default()).unwrap();
        assert!(results.iter().any(|m| m.effect.name == "Nausea"));

        // A query matching one effect's name and another's description ranks
        // the name hit first.
        let mut graph = graph;
        let fragment: GraphFragment = serde_json::from_str(
            r#"{"effects":{"e":{"name":"Stomach upset"}}}"#,
        )
        .unwrap();
        merge_fragment(&mut graph, &fragment);
        let results = search_effects(&graph, "stomach", &SearchConfig::default()).unwrap();
        assert_eq!(results[0].effect.name, "Stomach upset");
    }

    #[test]
    fn empty_query_is_a_caller_error() {
        let graph = graph_with_effects();
        assert_eq!(
            search_effects(&graph, "   ", &SearchConfig::default()).unwrap_err(),
            SearchError::EmptyQuery
        );
    }

    #[test]
    fn no_results_is_not_an_error() {
        let graph = graph_with_effects();
        let results = search_effects(&graph, "zzzzqqq", &SearchConfig::default()).unwrap();
        assert!(results.is_empty());
    }
}
