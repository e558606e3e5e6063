use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::parse::Operator;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Where the user overlay is looked for when no path is given.
pub const USER_CONFIG: &str = "~/.config/linechain/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub operators: Operators,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default)]
    pub aliases: Aliases,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub parse_brackets: bool,
    #[serde(default)]
    pub error_prefix: String,
    #[serde(default)]
    pub log_level: String,
    /// Empty disables run history.
    #[serde(default)]
    pub history_file: String,
}

impl Settings {
    /// The history file path, tilde expanded, when history is on.
    pub fn history_path(&self) -> Option<String> {
        let raw = self.history_file.trim();
        if raw.is_empty() {
            return None;
        }
        Some(shellexpand::tilde(raw).into_owned())
    }
}

/// Operator literals the segmenter splits on.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Operators {
    #[serde(default)]
    pub enabled: Vec<String>,
}

/// Built-in commands registered by name.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Commands {
    #[serde(default)]
    pub enabled: Vec<String>,
}

/// Extra names for registered commands: alias → target.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Aliases {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    operators: ListOverlay,
    #[serde(default)]
    commands: ListOverlay,
    #[serde(default)]
    aliases: AliasesOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    parse_brackets: Option<bool>,
    error_prefix: Option<String>,
    log_level: Option<String>,
    history_file: Option<String>,
}

/// Shape shared by `[operators]` and `[commands]`.
#[derive(Debug, Deserialize, Default)]
struct ListOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    enabled: Vec<String>,
    #[serde(default)]
    remove_enabled: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AliasesOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(default)]
    remove: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration: embedded defaults, then the overlay at `path`
    /// (or [`USER_CONFIG`] when `None`) if it exists.
    ///
    /// A malformed overlay is reported on stderr and ignored; logging is not
    /// up yet because its level comes from here.
    pub fn load(path: Option<&str>) -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay(path) {
            config.apply_overlay(overlay);
        }
        config
    }

    fn load_overlay(path: Option<&str>) -> Option<ConfigOverlay> {
        let explicit = path.is_some();
        let expanded = shellexpand::tilde(path.unwrap_or(USER_CONFIG));
        let path = Path::new(expanded.as_ref());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if explicit {
                    eprintln!("linechain: cannot read config {}: {e}", path.display());
                }
                return None;
            }
        };
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("linechain: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.parse_brackets {
            self.settings.parse_brackets = v;
        }
        if let Some(v) = s.error_prefix {
            self.settings.error_prefix = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.history_file {
            self.settings.history_file = v;
        }

        let o = overlay.operators;
        merge_list(&mut self.operators.enabled, o.enabled, &o.remove_enabled, o.replace);

        let c = overlay.commands;
        merge_list(&mut self.commands.enabled, c.enabled, &c.remove_enabled, c.replace);

        let a = overlay.aliases;
        if a.replace {
            self.aliases.entries = a.entries;
        } else {
            self.aliases.entries.retain(|name, _| !a.remove.contains(name));
            self.aliases.entries.extend(a.entries);
        }
    }

    /// Enabled operators in configuration order. Unknown literals are
    /// logged and skipped.
    pub fn operators(&self) -> Vec<Operator> {
        let mut operators = Vec::new();
        for literal in &self.operators.enabled {
            match Operator::from_literal(literal) {
                Some(op) if !operators.contains(&op) => operators.push(op),
                Some(_) => {}
                None => warn!("ignoring unknown operator '{literal}' in configuration"),
            }
        }
        operators
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert!(!config.operators.enabled.is_empty());
        assert!(!config.commands.enabled.is_empty());
        assert!(!config.aliases.entries.is_empty());
    }

    #[test]
    fn default_settings() {
        let config = Config::default_config();
        assert!(config.settings.parse_brackets);
        assert_eq!(config.settings.error_prefix, "linechain");
        assert_eq!(config.settings.log_level, "warn");
        assert!(config.settings.history_path().is_none());
    }

    #[test]
    fn default_operators_are_all_operators() {
        let config = Config::default_config();
        assert_eq!(config.operators(), Operator::ALL.to_vec());
    }

    #[test]
    fn default_commands_are_builtins() {
        let config = Config::default_config();
        for name in &config.commands.enabled {
            assert!(
                crate::commands::BUILTINS.contains(&name.as_str()),
                "{name} is not a built-in"
            );
        }
        assert_eq!(config.aliases.entries.get("print").map(String::as_str), Some("echo"));
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_overrides_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            error_prefix = "mysh"
            parse_brackets = false
        "#,
        );
        assert_eq!(config.settings.error_prefix, "mysh");
        assert!(!config.settings.parse_brackets);
        // Untouched scalars keep their defaults
        assert_eq!(config.settings.log_level, "warn");
    }

    #[test]
    fn overlay_removes_operators() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [operators]
            remove_enabled = [">>", "<"]
        "#,
        );
        let ops = config.operators();
        assert!(!ops.contains(&Operator::AppendOut));
        assert!(!ops.contains(&Operator::RedirectIn));
        assert!(ops.contains(&Operator::RedirectOut));
    }

    #[test]
    fn overlay_replaces_operators() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [operators]
            replace = true
            enabled = ["|"]
        "#,
        );
        assert_eq!(config.operators(), vec![Operator::Pipe]);
    }

    #[test]
    fn unknown_and_duplicate_operators_ignored() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [operators]
            replace = true
            enabled = ["&", "|", "|"]
        "#,
        );
        assert_eq!(config.operators(), vec![Operator::Pipe]);
    }

    #[test]
    fn overlay_extends_commands_deduped() {
        let mut config = Config::default_config();
        let before = config.commands.enabled.len();
        config.apply_overlay_str(
            r#"
            [commands]
            enabled = ["echo"]
            remove_enabled = ["wc"]
        "#,
        );
        assert_eq!(config.commands.enabled.len(), before - 1);
        assert!(!config.commands.enabled.contains(&"wc".to_string()));
    }

    #[test]
    fn overlay_merges_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            remove = ["print"]

            [aliases.entries]
            say = "echo"
        "#,
        );
        assert!(!config.aliases.entries.contains_key("print"));
        assert_eq!(config.aliases.entries.get("say").map(String::as_str), Some("echo"));
    }

    #[test]
    fn overlay_replaces_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            replace = true
        "#,
        );
        assert!(config.aliases.entries.is_empty());
    }

    #[test]
    fn missing_overlay_keeps_defaults() {
        let config = Config::load(Some("/nonexistent/linechain/config.toml"));
        assert_eq!(config.settings.error_prefix, "linechain");
    }

    #[test]
    fn load_reads_overlay_file() {
        let path = std::env::temp_dir().join(format!("linechain-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[settings]\nhistory_file = \"/tmp/linechain.log\"\n").unwrap();
        let config = Config::load(path.to_str());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.settings.history_path().as_deref(), Some("/tmp/linechain.log"));
    }

    #[test]
    fn dump_round_trips() {
        let config = Config::default_config();
        let dumped = toml::to_string(&config).unwrap();
        let reparsed: Config = toml::from_str(&dumped).unwrap();
        assert_eq!(reparsed.commands.enabled, config.commands.enabled);
        assert_eq!(reparsed.aliases.entries, config.aliases.entries);
    }
}
