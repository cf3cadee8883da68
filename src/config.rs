use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use cross_xdg::BaseDirs;

use crate::machine::EofPolicy;
use crate::tape::DEFAULT_FIXED_CAPACITY;

/// Which tape a machine built from [`Settings`] runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapePolicy {
    #[default]
    Growable,
    Fixed,
}

impl FromStr for TapePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "growable" | "grow" => Ok(TapePolicy::Growable),
            "fixed" => Ok(TapePolicy::Fixed),
            other => Err(format!("invalid tape policy '{other}', must be 'growable' or 'fixed'")),
        }
    }
}

impl fmt::Display for TapePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapePolicy::Growable => write!(f, "growable"),
            TapePolicy::Fixed => write!(f, "fixed"),
        }
    }
}

/// Engine defaults used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tape: TapePolicy,
    pub fixed_capacity: usize,
    pub eof: EofPolicy,
    /// Wall-clock limit for one run; `None` waits forever.
    pub timeout_ms: Option<u64>,
    pub max_steps: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tape: TapePolicy::Growable,
            fixed_capacity: DEFAULT_FIXED_CAPACITY,
            eof: EofPolicy::Zero,
            timeout_ms: None,
            max_steps: None,
        }
    }
}

impl Settings {
    /// Config file, then environment. Flags are applied by the caller.
    pub fn load() -> Self {
        let mut settings = load_from_toml().unwrap_or_default();
        settings.apply_env(|key| env::var(key).ok());
        settings
    }

    /// Overlay `BF_TAPE`, `BF_TAPE_SIZE`, `BF_EOF`, `BF_TIMEOUT_MS` and `BF_MAX_STEPS`.
    /// Values that fail to parse are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BF_TAPE").and_then(|s| s.parse().ok()) { self.tape = v; }
        if let Some(v) = lookup("BF_TAPE_SIZE").and_then(|s| parse_capacity(&s)) { self.fixed_capacity = v; }
        if let Some(v) = lookup("BF_EOF").and_then(|s| s.parse().ok()) { self.eof = v; }
        if let Some(v) = lookup("BF_TIMEOUT_MS").and_then(|s| s.trim().parse().ok()) { self.timeout_ms = Some(v); }
        if let Some(v) = lookup("BF_MAX_STEPS").and_then(|s| s.trim().parse().ok()) { self.max_steps = Some(v); }
    }
}

fn parse_capacity(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn config_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bfvm.toml");
    Some(path)
}

fn load_from_toml() -> Option<Settings> {
    let content = fs::read_to_string(config_path()?).ok()?;
    Some(parse_settings(&content))
}

/// Parse the `[machine]` section of a settings file.
///
/// Very small hand-rolled reader: `key = value` pairs, quoted or bare,
/// `#` comments. Unknown keys and bad values keep their defaults.
pub fn parse_settings(content: &str) -> Settings {
    let mut in_machine = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            in_machine = line[1..line.len() - 1].trim() == "machine";
            continue;
        }
        if !in_machine { continue; }
        if let Some((key, val_raw)) = line.split_once('=') {
            let val_raw = val_raw.trim();
            // Accept quoted or unquoted
            let val = if val_raw.len() >= 2 && val_raw.starts_with('"') && val_raw.ends_with('"') {
                &val_raw[1..val_raw.len() - 1]
            } else {
                val_raw
            };
            map.insert(key.trim().to_string(), val.to_string());
        }
    }

    let mut cfg = Settings::default();

    macro_rules! set {
        ($field:ident, $key:literal, $parse:expr) => {
            if let Some(v) = map.get($key).and_then(|s| $parse(s.as_str())) { cfg.$field = v; }
        };
    }

    set!(tape, "tape", |s: &str| s.parse::<TapePolicy>().ok());
    set!(fixed_capacity, "tape_size", parse_capacity);
    set!(eof, "eof", |s: &str| s.parse::<EofPolicy>().ok());
    set!(timeout_ms, "timeout_ms", |s: &str| s.parse::<u64>().ok().map(Some));
    set!(max_steps, "max_steps", |s: &str| s.parse::<usize>().ok().map(Some));

    cfg
}
