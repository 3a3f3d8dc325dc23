//! Dependency graph construction and topological grouping.
//!
//! Each sub-request may name at most one dependency, so the graph is a
//! forest of chains and the depth of a key is the length of its chain down
//! to a dependency-free key. Keys at the same depth form a group eligible
//! for concurrent execution; the executor runs groups in ascending depth
//! order with a barrier between them.

use std::collections::HashMap;

use crate::core::{envelope::BatchEnvelope, error::BatchError};

/// Topological partition of a batch envelope's request keys.
///
/// Group 0 holds keys with no dependency; group N holds keys whose longest
/// chain to a dependency-free key has length N. Within a group, keys keep
/// the envelope's insertion order. The graph carries no execution state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    groups: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for a validated envelope.
    ///
    /// Fails with a `DependencyError` when a `dependency` field references
    /// a key absent from the envelope, or when following dependency edges
    /// from any key revisits it.
    pub fn build(envelope: &BatchEnvelope) -> Result<Self, BatchError> {
        let mut depths: HashMap<&str, Mark> = HashMap::with_capacity(envelope.len());
        let mut groups: Vec<Vec<String>> = Vec::new();

        for (key, _) in envelope.iter() {
            let depth = resolve_depth(envelope, key, &mut depths)?;
            if groups.len() <= depth {
                groups.resize_with(depth + 1, Vec::new);
            }
            groups[depth].push(key.clone());
        }

        Ok(Self { groups })
    }

    /// Groups in ascending dependency-depth order.
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of dependency groups (longest chain length + 1).
    pub fn depth(&self) -> usize {
        self.groups.len()
    }
}

enum Mark {
    /// On the current DFS path; an edge back into it closes a cycle.
    Visiting,
    Done(usize),
}

fn resolve_depth<'a>(
    envelope: &'a BatchEnvelope,
    key: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<usize, BatchError> {
    match marks.get(key) {
        Some(Mark::Done(depth)) => return Ok(*depth),
        Some(Mark::Visiting) => {
            return Err(BatchError::dependency(
                format!("Dependency cycle detected at request '{key}'"),
                key,
            ));
        }
        None => {}
    }

    let request = envelope
        .get(key)
        .ok_or_else(|| BatchError::dependency(format!("Unknown request key '{key}'"), key))?;

    let depth = match request.dependency.as_deref() {
        None => 0,
        Some(dependency) => {
            if !envelope.contains_key(dependency) {
                return Err(BatchError::dependency(
                    format!("Request '{key}' depends on unknown request '{dependency}'"),
                    key,
                ));
            }
            marks.insert(key, Mark::Visiting);
            resolve_depth(envelope, dependency, marks)? + 1
        }
    };

    marks.insert(key, Mark::Done(depth));
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::envelope::{EnvelopeValidator, RawEnvelope, SubRequestSpec};

    fn envelope_of(entries: &[(&str, Option<&str>)]) -> BatchEnvelope {
        let raw = RawEnvelope::from_entries(
            entries
                .iter()
                .map(|(key, dependency)| {
                    (
                        key.to_string(),
                        SubRequestSpec {
                            url: Some(format!("http://example.com/{key}")),
                            dependency: dependency.map(str::to_string),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
        );
        EnvelopeValidator::new(20, false, false)
            .validate(&raw)
            .unwrap()
    }

    #[test]
    fn test_independent_requests_form_single_group() {
        let envelope = envelope_of(&[("a", None), ("b", None), ("c", None)]);
        let graph = DependencyGraph::build(&envelope).unwrap();
        assert_eq!(graph.depth(), 1);
        assert_eq!(graph.groups()[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn test_chain_produces_ascending_groups() {
        let envelope = envelope_of(&[("c", Some("b")), ("b", Some("a")), ("a", None)]);
        let graph = DependencyGraph::build(&envelope).unwrap();
        assert_eq!(
            graph.groups(),
            &[
                vec!["a".to_string()],
                vec!["b".to_string()],
                vec!["c".to_string()]
            ]
        );
    }

    #[test]
    fn test_shared_dependency_groups_siblings_together() {
        let envelope = envelope_of(&[("root", None), ("x", Some("root")), ("y", Some("root"))]);
        let graph = DependencyGraph::build(&envelope).unwrap();
        assert_eq!(graph.depth(), 2);
        assert_eq!(graph.groups()[1], vec!["x", "y"]);
    }

    #[test]
    fn test_groups_keep_envelope_order() {
        let envelope = envelope_of(&[("b", None), ("a", None)]);
        let graph = DependencyGraph::build(&envelope).unwrap();
        assert_eq!(graph.groups()[0], vec!["b", "a"]);
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let envelope = envelope_of(&[("a", Some("ghost"))]);
        let err = DependencyGraph::build(&envelope).unwrap_err();
        assert_eq!(err.error_type(), "DependencyError");
        assert_eq!(err.request_key(), Some("a"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let envelope = envelope_of(&[("a", Some("a"))]);
        let err = DependencyGraph::build(&envelope).unwrap_err();
        assert_eq!(err.error_type(), "DependencyError");
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let envelope = envelope_of(&[("a", Some("b")), ("b", Some("a"))]);
        let err = DependencyGraph::build(&envelope).unwrap_err();
        assert_eq!(err.error_type(), "DependencyError");
    }

    #[test]
    fn test_cycle_with_tail_rejected() {
        // d -> c -> b -> c is a cycle even though d itself is not on it.
        let envelope = envelope_of(&[("d", Some("c")), ("c", Some("b")), ("b", Some("c"))]);
        let err = DependencyGraph::build(&envelope).unwrap_err();
        assert_eq!(err.error_type(), "DependencyError");
    }

    #[test]
    fn test_diamond_depths() {
        // b and c both depend on a; d depends on c. Longest chain wins.
        let envelope = envelope_of(&[
            ("a", None),
            ("b", Some("a")),
            ("c", Some("a")),
            ("d", Some("c")),
        ]);
        let graph = DependencyGraph::build(&envelope).unwrap();
        assert_eq!(
            graph.groups(),
            &[
                vec!["a".to_string()],
                vec!["b".to_string(), "c".to_string()],
                vec!["d".to_string()]
            ]
        );
    }
}
