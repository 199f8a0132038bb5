//! Application configuration (YAML) and recipe files (TOML).
//!
//! Two independent document formats, loaded by two independent merge rules:
//! `AppConfig` is a single YAML file merged global-then-project (project
//! wins on any field it sets), the way the teacher's own `.workmux.yaml`
//! works. `Recipe`s are TOML, merged in three layers — builtin defaults,
//! user config, project config — with later layers overriding earlier ones
//! by recipe name.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Maximum agents of a single type in one recipe.
pub const MAX_AGENTS_PER_TYPE: u32 = 20;
/// Maximum total agents across all types in one recipe.
pub const MAX_AGENTS_TOTAL: u32 = 50;

/// Ambient application settings, read from YAML.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct AppConfig {
    /// Session name used when none is given on the command line.
    #[serde(default)]
    pub default_session: Option<String>,

    /// Use nerd-font icons in status output. Falls back to `NZM_ICONS` /
    /// `NERD_FONTS` environment variables when unset.
    #[serde(default)]
    pub icons: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let global = Self::load_from_path(&global_config_path()).unwrap_or_default().unwrap_or_default();
        let project = Self::load_from_path(Path::new(".nzm.yaml"))
            .unwrap_or_default()
            .unwrap_or_default();

        Ok(Self {
            default_session: project.default_session.or(global.default_session),
            icons: project.icons.or(global.icons),
        })
    }

    fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow!("failed to parse config at {}: {e}", path.display()))?;
        Ok(Some(config))
    }

    /// Whether icon glyphs should be used, consulting `NZM_ICONS` and
    /// `NERD_FONTS` when the config doesn't say.
    pub fn icons_enabled(&self) -> bool {
        if let Some(icons) = self.icons {
            return icons;
        }
        if let Ok(v) = std::env::var("NZM_ICONS") {
            return v != "0" && !v.eq_ignore_ascii_case("false");
        }
        std::env::var_os("NERD_FONTS").is_some()
    }
}

fn global_config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("nzm").join("config.yaml")
}

/// One named agent-team composition: how many panes of each agent type to
/// spin up together.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub agents: HashMap<String, u32>,
}

impl Recipe {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("recipe name must not be empty"));
        }
        let mut total = 0u32;
        for (agent, count) in &self.agents {
            if *count == 0 || *count > MAX_AGENTS_PER_TYPE {
                return Err(anyhow!(
                    "recipe '{}': agent '{agent}' count {count} must be between 1 and {MAX_AGENTS_PER_TYPE}",
                    self.name
                ));
            }
            total += count;
        }
        if total > MAX_AGENTS_TOTAL {
            return Err(anyhow!(
                "recipe '{}': total agent count {total} exceeds {MAX_AGENTS_TOTAL}",
                self.name
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
struct RecipeFile {
    #[serde(default, rename = "recipes")]
    recipes: Vec<Recipe>,
}

fn parse_recipe_file(contents: &str, path_for_errors: &str) -> Result<Vec<Recipe>> {
    let file: RecipeFile =
        toml::from_str(contents).with_context(|| format!("failed to parse recipe file {path_for_errors}"))?;
    for recipe in &file.recipes {
        recipe.validate()?;
    }
    Ok(file.recipes)
}

/// Recipes shipped with the binary, available even with no config files on disk.
fn builtin_recipes() -> Vec<Recipe> {
    vec![
        Recipe {
            name: "solo".to_string(),
            agents: HashMap::from([("cc".to_string(), 1)]),
        },
        Recipe {
            name: "pair".to_string(),
            agents: HashMap::from([("cc".to_string(), 1), ("cod".to_string(), 1)]),
        },
        Recipe {
            name: "trio".to_string(),
            agents: HashMap::from([
                ("cc".to_string(), 1),
                ("cod".to_string(), 1),
                ("gmi".to_string(), 1),
            ]),
        },
    ]
}

fn user_recipes_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("nzm").join("recipes.toml")
}

fn project_recipes_path() -> PathBuf {
    Path::new(".nzm").join("recipes.toml")
}

fn load_recipe_file(path: &Path) -> Result<Vec<Recipe>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    parse_recipe_file(&contents, &path.display().to_string())
}

/// Load and merge recipes from all three layers, project overriding user
/// overriding builtin, matched by name case-insensitively.
pub fn load_recipes() -> Result<Vec<Recipe>> {
    let mut by_name: HashMap<String, Recipe> = HashMap::new();

    for recipe in builtin_recipes()
        .into_iter()
        .chain(load_recipe_file(&user_recipes_path())?)
        .chain(load_recipe_file(&project_recipes_path())?)
    {
        by_name.insert(recipe.name.to_lowercase(), recipe);
    }

    let mut recipes: Vec<Recipe> = by_name.into_values().collect();
    recipes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_recipes_are_valid() {
        for recipe in builtin_recipes() {
            recipe.validate().unwrap();
        }
    }

    #[test]
    fn rejects_empty_name() {
        let recipe = Recipe {
            name: String::new(),
            agents: HashMap::new(),
        };
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn rejects_count_out_of_range() {
        let mut recipe = Recipe {
            name: "big".to_string(),
            agents: HashMap::new(),
        };
        recipe.agents.insert("cc".to_string(), 21);
        assert!(recipe.validate().is_err());

        recipe.agents.insert("cc".to_string(), 0);
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn rejects_total_over_budget() {
        let mut recipe = Recipe {
            name: "huge".to_string(),
            agents: HashMap::new(),
        };
        recipe.agents.insert("cc".to_string(), 20);
        recipe.agents.insert("cod".to_string(), 20);
        recipe.agents.insert("gmi".to_string(), 20);
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn project_recipe_overrides_builtin_by_name_case_insensitively() {
        let project_toml = r#"
            [[recipes]]
            name = "Solo"
            [recipes.agents]
            cc = 3
        "#;
        let parsed = parse_recipe_file(project_toml, "<test>").unwrap();
        let mut by_name: HashMap<String, Recipe> = HashMap::new();
        for recipe in builtin_recipes().into_iter().chain(parsed) {
            by_name.insert(recipe.name.to_lowercase(), recipe);
        }
        assert_eq!(by_name.get("solo").unwrap().agents.get("cc"), Some(&3));
    }
}
