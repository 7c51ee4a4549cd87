//! Foreign-key dependency ordering for cloning runs.
//!
//! Kahn's algorithm over the foreign-key metadata of the participating
//! record types. Edges outside the input set, self-references, and the
//! tenant reference itself are ignored. A cycle is always a hard error
//! naming the implicated types; the order is never truncated or
//! guessed.

use std::collections::{BTreeMap, VecDeque};

use crate::error::TenancyError;
use crate::registry::RecordDescriptor;

/// Total order over `descriptors` such that every foreign-key target
/// precedes its referrer. Deterministic for a given input order.
pub fn dependency_order<'a>(
    descriptors: &[&'a RecordDescriptor],
) -> Result<Vec<&'a RecordDescriptor>, TenancyError> {
    let by_name: BTreeMap<&str, &RecordDescriptor> = descriptors
        .iter()
        .map(|d| (d.record_type.as_str(), *d))
        .collect();

    // graph[target] = types that reference target, so target sorts first.
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for descriptor in descriptors {
        in_degree.entry(descriptor.record_type.as_str()).or_insert(0);
    }

    for descriptor in descriptors {
        let name = descriptor.record_type.as_str();
        for fk in &descriptor.foreign_keys {
            let target = fk.target_type.as_str();
            if target == name || !by_name.contains_key(target) {
                continue;
            }
            dependents.entry(target).or_default().push(name);
            *in_degree.entry(name).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&str> = descriptors
        .iter()
        .map(|d| d.record_type.as_str())
        .filter(|name| in_degree[name] == 0)
        .collect();

    let mut ordered = Vec::with_capacity(descriptors.len());
    while let Some(current) = queue.pop_front() {
        ordered.push(by_name[current]);
        if let Some(children) = dependents.get(current) {
            for child in children {
                let degree = in_degree.get_mut(child).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if ordered.len() != descriptors.len() {
        let mut cycle: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        cycle.sort();
        return Err(TenancyError::CyclicDependency(cycle));
    }

    Ok(ordered)
}
