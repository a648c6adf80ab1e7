//! Static catalog of heavy-artifact directory names

use std::collections::HashMap;

/// One deletable artifact kind, keyed in the catalog by directory base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDef {
    /// Display name shown in the table (same as the directory name for
    /// built-ins).
    pub name: String,
    pub category: String,
}

fn def(name: &str, category: &str) -> (String, TargetDef) {
    (
        name.to_string(),
        TargetDef {
            name: name.to_string(),
            category: category.to_string(),
        },
    )
}

/// The built-in catalog. Pure data; merged with user include/exclude lists
/// once before a run starts.
pub fn default_targets() -> Vec<(String, TargetDef)> {
    vec![
        def("node_modules", "node"),
        def(".pnpm", "node"),
        def(".pnpm-store", "node"),
        def("pnpm-store", "node"),
        def(".yarn", "node"),
        def("bower_components", "node"),
        def(".turbo", "node"),
        def(".next", "node"),
        def(".nuxt", "node"),
        def(".expo", "node"),
        def(".react-native", "node"),
        def(".angular", "node"),
        def(".vue", "node"),
        def(".svelte", "node"),
        def(".ember", "node"),
        def(".meteor", "node"),
        def(".express", "node"),
        def("express", "node"),
        def(".koa", "node"),
        def("koa", "node"),
        def(".hapi", "node"),
        def("hapi", "node"),
        def(".sails.js", "node"),
        def("sails.js", "node"),
        def(".loopback", "node"),
        def("loopback", "node"),
        def(".adonisjs", "node"),
        def("adonisjs", "node"),
        def(".nestjs", "node"),
        def("nestjs", "node"),
        def(".feathersjs", "node"),
        def("feathersjs", "node"),
        def("target", "rust"),
        def(".cargo", "rust"),
        def(".venv", "python"),
        def("venv", "python"),
        def("env", "python"),
        def(".virtualenvs", "python"),
        def("__pycache__", "python"),
        def(".pytest_cache", "python"),
        def(".mypy_cache", "python"),
        def(".ruff_cache", "python"),
        def(".tox", "python"),
        def(".pip", "python"),
        def(".pipenv", "python"),
        def(".poetry", "python"),
        def(".django", "python"),
        def(".flask", "python"),
        def(".gradle", "java"),
        def(".m2", "java"),
        def(".ivy2", "java"),
        def(".nuget", "dotnet"),
        def(".pub-cache", "dart"),
        def(".dart_tool", "dart"),
        def(".gem", "ruby"),
        def(".rails", "ruby"),
        def(".laravel", "php"),
        def(".symfony", "php"),
        def(".yii", "php"),
        def(".codeigniter", "php"),
        def(".cakephp", "php"),
        def(".zend", "php"),
        def(".phalcon", "php"),
        def(".slim", "php"),
        def(".fuelphp", "php"),
        def(".lumen", "php"),
        def(".silex", "php"),
        def("vendor", "go"),
        def(".cache", "build"),
        def("dist", "build"),
        def("build", "build"),
        def("out", "build"),
        def("coverage", "build"),
    ]
}

/// Merge the built-in catalog with user include/exclude lists. Includes get
/// category `custom`; excludes remove entries by directory name.
pub fn build_catalog(includes: &[String], excludes: &[String]) -> HashMap<String, TargetDef> {
    let mut catalog: HashMap<String, TargetDef> = default_targets().into_iter().collect();

    for name in includes {
        if name.is_empty() {
            continue;
        }
        catalog.insert(
            name.clone(),
            TargetDef {
                name: name.clone(),
                category: "custom".to_string(),
            },
        );
    }

    for name in excludes {
        catalog.remove(name);
    }

    catalog
}

/// Parse a comma-separated list of directory names, trimming blanks.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn sorted_target_names(catalog: &HashMap<String, TargetDef>) -> Vec<String> {
    let mut names: Vec<String> = catalog.keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_common_artifacts() {
        let catalog = build_catalog(&[], &[]);
        assert_eq!(catalog["node_modules"].category, "node");
        assert_eq!(catalog["target"].category, "rust");
        assert_eq!(catalog["__pycache__"].category, "python");
    }

    #[test]
    fn test_include_adds_custom_entry() {
        let includes = vec!["my_cache".to_string()];
        let catalog = build_catalog(&includes, &[]);
        assert_eq!(catalog["my_cache"].category, "custom");
        // Built-ins survive alongside the include
        assert!(catalog.contains_key("node_modules"));
    }

    #[test]
    fn test_exclude_removes_entry() {
        let excludes = vec!["node_modules".to_string()];
        let catalog = build_catalog(&[], &excludes);
        assert!(!catalog.contains_key("node_modules"));
        assert!(catalog.contains_key("target"));
    }

    #[test]
    fn test_include_can_override_builtin_category() {
        let includes = vec!["target".to_string()];
        let catalog = build_catalog(&includes, &[]);
        assert_eq!(catalog["target"].category, "custom");
    }

    #[test]
    fn test_parse_target_list() {
        assert_eq!(
            parse_target_list("a, b ,,c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(parse_target_list("").is_empty());
        assert!(parse_target_list(" , ").is_empty());
    }

    #[test]
    fn test_sorted_target_names() {
        let catalog = build_catalog(&["zzz".to_string(), "aaa".to_string()], &[]);
        let names = sorted_target_names(&catalog);
        assert_eq!(names.first().map(String::as_str), Some(".adonisjs"));
        assert!(names.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(names.contains(&"zzz".to_string()));
    }
}
