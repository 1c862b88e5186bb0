use rustc_hash::{FxHashMap, FxHashSet};

use pkm_normalize::PackageName;
use pkm_version::Version;

#[derive(Debug, thiserror::Error)]
#[error("dependency graph among resolved packages contains a cycle involving `{0}`")]
pub struct CycleError(pub PackageName);

/// Orders a solved package map so that every package appears after all of its dependencies.
/// Kahn's algorithm over the edges reported by `dependencies_of`, rather than recursive DFS, so a
/// cycle is reported as an error instead of overflowing the stack.
pub fn topological_build_order(
    decisions: &FxHashMap<PackageName, Version>,
    dependencies_of: impl Fn(&PackageName, &Version) -> Vec<PackageName>,
) -> Result<Vec<PackageName>, CycleError> {
    let mut in_degree: FxHashMap<PackageName, usize> =
        decisions.keys().map(|name| (name.clone(), 0)).collect();
    let mut dependents: FxHashMap<PackageName, Vec<PackageName>> = FxHashMap::default();

    for (name, version) in decisions {
        for dep in dependencies_of(name, version) {
            if !decisions.contains_key(&dep) {
                continue;
            }
            *in_degree.get_mut(name).expect("name is a key of decisions") += 1;
            dependents.entry(dep).or_default().push(name.clone());
        }
    }

    let mut ready: Vec<PackageName> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| name.clone())
        .collect();
    ready.sort();

    let mut order = Vec::with_capacity(decisions.len());
    let mut visited: FxHashSet<PackageName> = FxHashSet::default();

    while let Some(name) = ready.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        order.push(name.clone());

        if let Some(names) = dependents.get(&name) {
            let mut newly_ready = Vec::new();
            for dependent in names {
                let degree = in_degree.get_mut(dependent).expect("dependent is a key of decisions");
                *degree -= 1;
                if *degree == 0 {
                    newly_ready.push(dependent.clone());
                }
            }
            newly_ready.sort();
            ready.extend(newly_ready);
        }
    }

    if order.len() != decisions.len() {
        let stuck = decisions
            .keys()
            .find(|name| !visited.contains(*name))
            .expect("order is short, so some package was never visited")
            .clone();
        return Err(CycleError(stuck));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn name(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    fn version() -> Version {
        Version::from_str("1.0.0").unwrap()
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let mut decisions = FxHashMap::default();
        decisions.insert(name("app"), version());
        decisions.insert(name("lib"), version());
        decisions.insert(name("core"), version());

        let edges: FxHashMap<&str, Vec<&str>> = [("app", vec!["lib"]), ("lib", vec!["core"]), ("core", vec![])]
            .into_iter()
            .collect();

        let order = topological_build_order(&decisions, |n, _| {
            edges[n.as_str()].iter().map(|s| name(s)).collect()
        })
        .unwrap();

        let pos = |s: &str| order.iter().position(|n| n.as_str() == s).unwrap();
        assert!(pos("core") < pos("lib"));
        assert!(pos("lib") < pos("app"));
    }

    #[test]
    fn detects_a_cycle() {
        let mut decisions = FxHashMap::default();
        decisions.insert(name("a"), version());
        decisions.insert(name("b"), version());

        let edges: FxHashMap<&str, Vec<&str>> = [("a", vec!["b"]), ("b", vec!["a"])].into_iter().collect();

        let result = topological_build_order(&decisions, |n, _| edges[n.as_str()].iter().map(|s| name(s)).collect());
        assert!(result.is_err());
    }
}
