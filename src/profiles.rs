//! Profile enumeration from the Firefox data directory.
//!
//! `profiles.ini` indexes the installed profiles; each `Profile*` section
//! carries a `Path` key relative to the data directory.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Platform default location of the Firefox user data directory.
pub fn default_base_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|appdata| Path::new(&appdata).join("Mozilla").join("Firefox"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|home| Path::new(&home).join("Library/Application Support/Firefox"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = PathBuf::from(std::env::var_os("HOME")?);
        let snap = home.join("snap/firefox/common/.mozilla/firefox");
        if snap.is_dir() {
            return Some(snap);
        }
        let snap_esr = home.join("snap/firefox/common/.mozilla/firefox-esr");
        if snap_esr.is_dir() {
            return Some(snap_esr);
        }
        Some(home.join(".mozilla/firefox"))
    }
}

/// Profile directories listed in `profiles.ini`, in file order.
pub fn read_profiles(basepath: &Path) -> Result<Vec<PathBuf>> {
    let profile_ini = basepath.join("profiles.ini");
    debug!("Reading profiles from {:?}", profile_ini);

    if !profile_ini.is_file() {
        warn!("profiles.ini not found in {:?}", basepath);
        return Err(Error::ProfilesIniMissing(basepath.to_path_buf()));
    }

    let ini = Ini::load_from_file(&profile_ini).map_err(|e| Error::BadProfilesIni(e.to_string()))?;

    let mut profiles = Vec::new();
    for (section, properties) in ini.iter() {
        let Some(section) = section else { continue };
        if !section.starts_with("Profile") {
            continue;
        }
        match properties.get("Path") {
            Some(path) => profiles.push(basepath.join(path)),
            None => warn!("Section {} in profiles.ini has no Path key", section),
        }
    }

    debug!("Read {} profile sections", profiles.len());
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_profiles_ini_is_a_typed_error() {
        let tmp = tempfile::tempdir().unwrap();
        match read_profiles(tmp.path()) {
            Err(Error::ProfilesIniMissing(path)) => assert_eq!(path, tmp.path()),
            other => panic!("expected ProfilesIniMissing, got {:?}", other),
        }
    }

    #[test]
    fn profile_sections_come_back_in_file_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("profiles.ini"),
            "[General]\n\
             StartWithLastProfile=1\n\
             \n\
             [Profile0]\n\
             Name=default\n\
             IsRelative=1\n\
             Path=abcd1234.default\n\
             \n\
             [Profile1]\n\
             Name=dev-edition\n\
             IsRelative=1\n\
             Path=wxyz9876.dev-edition-default\n",
        )
        .unwrap();

        let profiles = read_profiles(tmp.path()).unwrap();
        assert_eq!(
            profiles,
            vec![
                tmp.path().join("abcd1234.default"),
                tmp.path().join("wxyz9876.dev-edition-default"),
            ]
        );
    }

    #[test]
    fn sections_without_a_path_key_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("profiles.ini"),
            "[Profile0]\n\
             Name=broken\n\
             \n\
             [Profile1]\n\
             Path=kept.default\n\
             \n\
             [Install4F96D1932A9F858E]\n\
             Default=kept.default\n",
        )
        .unwrap();

        let profiles = read_profiles(tmp.path()).unwrap();
        assert_eq!(profiles, vec![tmp.path().join("kept.default")]);
    }
}
