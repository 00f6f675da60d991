//! Deep merge of YAML configuration layers.
//!
//! # Merge Rules
//!
//! - Mappings are merged recursively
//! - Sequences are replaced entirely (not merged)
//! - Null values in overlay delete the corresponding key from base
//! - Scalars in overlay replace scalars in base

use serde_yaml::Value;

/// Deep merge two YAML values; `overlay` wins at the point of conflict.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }
            Value::Mapping(result)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge layers in order, later layers taking precedence.
pub fn merge_configs(configs: &[Value]) -> Value {
    configs
        .iter()
        .fold(Value::Mapping(Default::default()), |acc, config| {
            deep_merge(&acc, config)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn nested_keys_are_merged() {
        let base = yaml("index:\n  url: https://mirror.example\n  retries: 5\n");
        let overlay = yaml("index:\n  retries: 2\n");

        let result = deep_merge(&base, &overlay);
        assert_eq!(result["index"]["url"], "https://mirror.example");
        assert_eq!(result["index"]["retries"], 2);
    }

    #[test]
    fn sequences_are_replaced() {
        let base = yaml("discovery:\n  extra_roots: [/a, /b]\n");
        let overlay = yaml("discovery:\n  extra_roots: [/c]\n");

        let result = deep_merge(&base, &overlay);
        let roots = result["discovery"]["extra_roots"].as_sequence().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0], "/c");
    }

    #[test]
    fn null_deletes_key() {
        let base = yaml("cache:\n  ttl_secs: 60\n  enabled: false\n");
        let overlay = yaml("cache:\n  ttl_secs: ~\n");

        let result = deep_merge(&base, &overlay);
        assert!(result["cache"].get("ttl_secs").is_none());
        assert_eq!(result["cache"]["enabled"], false);
    }

    #[test]
    fn later_layers_win() {
        let layers = vec![
            yaml("output: verbose\nindex:\n  max_parallel: 2\n"),
            yaml("output: quiet\n"),
            yaml("index:\n  max_parallel: 6\n"),
        ];
        let merged = merge_configs(&layers);
        assert_eq!(merged["output"], "quiet");
        assert_eq!(merged["index"]["max_parallel"], 6);
    }

    #[test]
    fn no_layers_is_empty_mapping() {
        assert!(merge_configs(&[]).as_mapping().unwrap().is_empty());
    }
}
