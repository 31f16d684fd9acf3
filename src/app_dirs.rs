use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("lingo");
            Some(state_dir.join("lingo.db"))
        } else {
            ProjectDirs::from("", "", "lingo")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("lingo.db"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_names_the_database_file() {
        if let Some(path) = AppDirs::db_path() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("lingo.db"));
            assert!(path.components().any(|c| c.as_os_str() == "lingo"));
        }
    }
}
