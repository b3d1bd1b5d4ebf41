/*
 * Resolves the per-user directory the packager keeps its configuration in.
 * The location is platform specific (for example `~/.config/<app>` on Linux or
 * `AppData/Local/<app>/config` on Windows) and is created on first use.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "CodePackager";

/*
 * Returns the local (non-roaming) configuration directory for `app_name`,
 * creating it when missing. `None` means the platform offers no home-relative
 * location or the directory could not be created; the failure is logged.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    let config_path = proj_dirs.config_local_dir();
    if config_path.exists() {
        log::trace!("PathUtils: Config directory {config_path:?} already exists.");
    } else {
        if let Err(e) = fs::create_dir_all(config_path) {
            log::error!("PathUtils: Failed to create config directory {config_path:?}: {e}");
            return None;
        }
        log::debug!("PathUtils: Created config directory {config_path:?}.");
    }
    Some(config_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_created_and_stable() {
        let unique_app_name = format!("TestApp_PathUtils_{}", rand::random::<u128>());

        let first = get_base_app_config_local_dir(&unique_app_name)
            .expect("config dir should resolve for a fresh app name");
        assert!(first.is_dir());
        assert!(
            first
                .to_string_lossy()
                .to_lowercase()
                .contains(&unique_app_name.to_lowercase())
        );

        let second = get_base_app_config_local_dir(&unique_app_name);
        assert_eq!(second.as_ref(), Some(&first));

        if let Err(e) = fs::remove_dir_all(&first) {
            eprintln!("Test cleanup error for {first:?}: {e}");
        }
    }
}
