//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".snipctx/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_model")]
    pub model: String,
    #[serde(default = "Defaults::default_token_budget")]
    pub token_budget: u32,
    #[serde(default = "Defaults::default_theme")]
    pub theme: String,
    #[serde(default = "Defaults::default_preview_max_lines")]
    pub preview_max_lines: usize,
}

impl Defaults {
    fn default_model() -> String {
        "openai:gpt-4o-mini".to_owned()
    }

    fn default_token_budget() -> u32 {
        120_000
    }

    fn default_theme() -> String {
        "base16-ocean.dark".into()
    }

    fn default_preview_max_lines() -> usize {
        200
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            token_budget: Self::default_token_budget(),
            theme: Self::default_theme(),
            preview_max_lines: Self::default_preview_max_lines(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    #[serde(default = "Display::default_show_signatures")]
    pub show_signatures: bool,
    #[serde(default = "Display::default_show_kinds")]
    pub show_kinds: bool,
}

impl Display {
    fn default_show_signatures() -> bool {
        true
    }

    fn default_show_kinds() -> bool {
        true
    }
}

impl Default for Display {
    fn default() -> Self {
        Self {
            show_signatures: Self::default_show_signatures(),
            show_kinds: Self::default_show_kinds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybindings {
    #[serde(default = "Keybindings::default_up")]
    pub up: String,
    #[serde(default = "Keybindings::default_down")]
    pub down: String,
    #[serde(default = "Keybindings::default_toggle")]
    pub toggle: String,
    #[serde(default = "Keybindings::default_copy")]
    pub copy: String,
    #[serde(default = "Keybindings::default_refresh")]
    pub refresh: String,
    #[serde(default = "Keybindings::default_quit")]
    pub quit: String,
}

impl Keybindings {
    fn default_up() -> String {
        "up".into()
    }

    fn default_down() -> String {
        "down".into()
    }

    fn default_toggle() -> String {
        "space".into()
    }

    fn default_copy() -> String {
        "c".into()
    }

    fn default_refresh() -> String {
        "r".into()
    }

    fn default_quit() -> String {
        "q".into()
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: Self::default_up(),
            down: Self::default_down(),
            toggle: Self::default_toggle(),
            copy: Self::default_copy(),
            refresh: Self::default_refresh(),
            quit: Self::default_quit(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    model: Option<String>,
    theme: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            model: env::var("SNIPCTX_MODEL").ok(),
            theme: env::var("SNIPCTX_THEME").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(model: &str, theme: &str) -> Self {
        Self {
            model: Some(model.to_owned()),
            theme: Some(theme.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace
    /// config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            display: merge_display(self.display, other.display),
            keybindings: merge_keybindings(self.keybindings, other.keybindings),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        model: overlay_or(base.model, overlay.model, Defaults::default_model),
        token_budget: if overlay.token_budget != Defaults::default_token_budget() {
            overlay.token_budget
        } else {
            base.token_budget
        },
        theme: overlay_or(base.theme, overlay.theme, Defaults::default_theme),
        preview_max_lines: if overlay.preview_max_lines != Defaults::default_preview_max_lines() {
            overlay.preview_max_lines
        } else {
            base.preview_max_lines
        },
    }
}

fn merge_display(base: Display, overlay: Display) -> Display {
    Display {
        show_signatures: if overlay.show_signatures != Display::default_show_signatures() {
            overlay.show_signatures
        } else {
            base.show_signatures
        },
        show_kinds: if overlay.show_kinds != Display::default_show_kinds() {
            overlay.show_kinds
        } else {
            base.show_kinds
        },
    }
}

fn merge_keybindings(base: Keybindings, overlay: Keybindings) -> Keybindings {
    Keybindings {
        up: overlay_or(base.up, overlay.up, Keybindings::default_up),
        down: overlay_or(base.down, overlay.down, Keybindings::default_down),
        toggle: overlay_or(base.toggle, overlay.toggle, Keybindings::default_toggle),
        copy: overlay_or(base.copy, overlay.copy, Keybindings::default_copy),
        refresh: overlay_or(base.refresh, overlay.refresh, Keybindings::default_refresh),
        quit: overlay_or(base.quit, overlay.quit, Keybindings::default_quit),
    }
}

fn overlay_or(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() { overlay } else { base }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("snipctx/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(model) = env.model {
        config.defaults.model = model;
    }
    if let Some(theme) = env.theme {
        config.defaults.theme = theme;
    }
    config
}
