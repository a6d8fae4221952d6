//! Command-line handling for the server binary.

use gameshelf_config::DEFAULT_CONFIG_FILE;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "GAMESHELF_CONFIG";

/// Where the configuration file path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: String,
    pub origin: &'static str,
}

/// Pick the configuration path: `--config <path>` or `--config=<path>`,
/// then a non-empty `GAMESHELF_CONFIG`, then `gameshelf.toml`.
///
/// `args` excludes the program name.
pub fn resolve_config_path(
    args: impl IntoIterator<Item = String>,
    env_value: Option<String>,
) -> ConfigLocation {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let path = match arg.strip_prefix("--config") {
            Some("") => args.next(),
            Some(rest) => rest.strip_prefix('=').map(str::to_string),
            None => None,
        };
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            return ConfigLocation {
                path,
                origin: "--config",
            };
        }
    }

    if let Some(path) = env_value.filter(|p| !p.is_empty()) {
        return ConfigLocation {
            path,
            origin: CONFIG_ENV,
        };
    }

    ConfigLocation {
        path: DEFAULT_CONFIG_FILE.to_string(),
        origin: "default",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_wins_over_environment() {
        let loc = resolve_config_path(
            args(&["--config", "a.toml"]),
            Some("b.toml".into()),
        );
        assert_eq!(loc.path, "a.toml");
        assert_eq!(loc.origin, "--config");

        let loc = resolve_config_path(args(&["--config=c.toml"]), None);
        assert_eq!(loc.path, "c.toml");
    }

    #[test]
    fn dangling_flag_falls_through() {
        let loc = resolve_config_path(args(&["--config"]), Some("env.toml".into()));
        assert_eq!(loc.path, "env.toml");
        assert_eq!(loc.origin, CONFIG_ENV);
    }

    #[test]
    fn unrelated_flags_are_ignored() {
        let loc = resolve_config_path(args(&["--configure", "--verbose"]), Some(String::new()));
        assert_eq!(loc.path, DEFAULT_CONFIG_FILE);
        assert_eq!(loc.origin, "default");
    }
}
