//! Argument helpers shared by the binaries. Flags take either `--name value` or
//! `--name=value`; anything unparsable is treated as absent.

use std::path::PathBuf;

/// Process arguments without the program name.
pub fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return Some(raw.trim());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim());
        }
    }
    None
}

pub fn db_path_arg(args: &[String]) -> Option<PathBuf> {
    flag_value(args, "--db")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

pub fn usize_arg(args: &[String], name: &str) -> Option<usize> {
    flag_value(args, name).and_then(|raw| raw.parse().ok())
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn db_path_in_both_spellings() {
        assert_eq!(
            db_path_arg(&argv(&["--db", "fights.db"])),
            Some(PathBuf::from("fights.db"))
        );
        assert_eq!(
            db_path_arg(&argv(&["--json", "--db= other.db "])),
            Some(PathBuf::from("other.db"))
        );
        assert_eq!(db_path_arg(&argv(&["--db"])), None);
        assert_eq!(db_path_arg(&argv(&["--db="])), None);
        assert_eq!(db_path_arg(&argv(&["--dbx", "a.db"])), None);
    }

    #[test]
    fn numbers_parse_or_are_ignored() {
        let args = argv(&["--limit", "40", "--bins=12", "--seed", "abc"]);
        assert_eq!(usize_arg(&args, "--limit"), Some(40));
        assert_eq!(usize_arg(&args, "--bins"), Some(12));
        assert_eq!(usize_arg(&args, "--seed"), None);
        assert_eq!(usize_arg(&args, "--synthetic"), None);
    }

    #[test]
    fn flags_match_exactly() {
        let args = argv(&["--json", "--verbose=1"]);
        assert!(has_flag(&args, "--json"));
        assert!(!has_flag(&args, "--verbose"));
    }
}
