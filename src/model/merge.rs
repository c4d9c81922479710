use std::collections::HashMap;

use super::keyed::KeyedValue;

/// Merge `overrides` into `base` by identity.
///
/// Base order is kept and a shared identity takes the override's value in the
/// base's position. New identities are appended in override order. Each
/// identity appears once in the result, even if `base` itself repeated it.
pub fn merge<T: KeyedValue>(base: &[T], overrides: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(base.len() + overrides.len());
    let mut index: HashMap<T::Key, usize> = HashMap::with_capacity(merged.capacity());

    for item in base.iter().chain(overrides) {
        match index.get(item.key()) {
            Some(&pos) => merged[pos] = item.clone(),
            None => {
                index.insert(item.key().clone(), merged.len());
                merged.push(item.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use proptest::prelude::*;

    use super::*;
    use crate::model::{EnvVariable, ExposedPort, Label, Volume};

    #[test]
    fn labels_override_and_append() {
        let base = vec![Label::new("A", "1"), Label::new("B", "2")];
        let overrides = vec![Label::new("B", "3"), Label::new("C", "4")];

        let merged = merge(&base, &overrides);
        assert_eq!(
            merged,
            vec![Label::new("A", "1"), Label::new("B", "3"), Label::new("C", "4")]
        );
    }

    #[test]
    fn volumes_merge_by_container_path() {
        let base = vec![
            Volume::new("1", Some("A".into())),
            Volume::new("2", Some("B".into())),
        ];
        let overrides = vec![
            Volume::new("3", Some("B".into())),
            Volume::new("1", Some("override".into())),
        ];

        let merged = merge(&base, &overrides);
        let by_path: BTreeMap<_, _> = merged
            .iter()
            .map(|v| (v.container_path.as_str(), v.host_path.clone().unwrap()))
            .collect();
        assert_eq!(merged.len(), 3);
        assert_eq!(by_path["1"], std::path::PathBuf::from("override"));
        assert_eq!(by_path["2"], std::path::PathBuf::from("B"));
        assert_eq!(by_path["3"], std::path::PathBuf::from("B"));
        // override of "1" keeps the base position
        assert_eq!(merged[0].container_path, "1");
    }

    #[test]
    fn ports_merge_by_container_port() {
        let base = vec![ExposedPort::new(80, None)];
        let overrides = vec![ExposedPort::new(443, Some(8443))];
        let merged = merge(&base, &overrides);
        assert_eq!(
            merged,
            vec![ExposedPort::new(80, None), ExposedPort::new(443, Some(8443))]
        );
    }

    #[test]
    fn empty_inputs() {
        let none: Vec<EnvVariable> = Vec::new();
        assert!(merge(&none, &none).is_empty());
        let base = vec![EnvVariable::new("A", "1")];
        assert_eq!(merge(&base, &none), base);
        assert_eq!(merge(&none, &base), base);
    }

    #[test]
    fn duplicate_base_keys_collapse() {
        let base = vec![EnvVariable::new("A", "1"), EnvVariable::new("A", "2")];
        assert_eq!(merge(&base, &[]), vec![EnvVariable::new("A", "2")]);
    }

    fn env_list() -> impl Strategy<Value = Vec<EnvVariable>> {
        prop::collection::vec(("[a-e]{1,2}", "[0-9]{1,3}"), 0..12).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| EnvVariable::new(k, v))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(base in env_list(), overrides in env_list()) {
            let once = merge(&base, &overrides);
            let twice = merge(&once, &overrides);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn merge_keeps_every_identity_and_prefers_overrides(
            base in env_list(),
            overrides in env_list(),
        ) {
            let merged = merge(&base, &overrides);

            let keys: Vec<&String> = merged.iter().map(|e| &e.key).collect();
            let unique: HashSet<&String> = keys.iter().copied().collect();
            prop_assert_eq!(keys.len(), unique.len());

            let expected: HashSet<&String> =
                base.iter().chain(&overrides).map(|e| &e.key).collect();
            prop_assert_eq!(unique, expected);

            let last_override: HashMap<&String, &String> =
                overrides.iter().map(|e| (&e.key, &e.value)).collect();
            let last_base: HashMap<&String, &String> =
                base.iter().map(|e| (&e.key, &e.value)).collect();
            for entry in &merged {
                match last_override.get(&entry.key) {
                    Some(value) => prop_assert_eq!(&entry.value, *value),
                    None => prop_assert_eq!(&entry.value, last_base[&entry.key]),
                }
            }
        }
    }
}
