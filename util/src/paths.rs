use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Resolve a configured storage root. Relative roots are taken from current_dir().
pub fn storage_root(configured: &str) -> PathBuf {
    let p = PathBuf::from(configured);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// {root}/results
pub fn results_dir(root: &Path) -> PathBuf {
    root.join("results")
}

/// {root}/results/{key}.json
pub fn result_path(root: &Path, key: &str) -> PathBuf {
    results_dir(root).join(format!("{}.json", sanitize_key(key)))
}

/// {root}/logs
pub fn logs_dir(root: &Path) -> PathBuf {
    root.join("logs")
}

/// Keys come from caller-supplied ids; keep them to a single path segment.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_paths_stay_inside_results_dir() {
        let root = Path::new("/data");
        assert_eq!(
            result_path(root, "a1-s1"),
            PathBuf::from("/data/results/a1-s1.json")
        );
        assert_eq!(
            result_path(root, "../../etc/passwd"),
            PathBuf::from("/data/results/_.._etc_passwd.json")
        );
    }

    #[test]
    fn absolute_roots_are_kept() {
        assert_eq!(storage_root("/srv/x"), PathBuf::from("/srv/x"));
        assert!(storage_root("rel").is_absolute());
    }
}
