//! NSS library discovery.
//!
//! Firefox ships its own copy of NSS and there is no single install
//! location across platforms, so we probe an ordered list of candidate
//! directories and take the first one the loader accepts.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, error, warn};

use crate::error::{Error, LoadAttempt, Result};

/// Environment variable supplying an extra first-priority search directory.
pub const NSS_LIB_PATH: &str = "NSS_LIB_PATH";

/// Platform file name of the NSS shared library.
pub fn library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "nss3.dll"
    } else if cfg!(target_os = "macos") {
        "libnss3.dylib"
    } else {
        "libnss3.so"
    }
}

/// Ordered candidate directories for the current platform. An empty path
/// means "let the system loader search its default locations".
pub fn candidate_directories() -> Vec<PathBuf> {
    let mut locations: Vec<PathBuf> = Vec::new();

    if let Some(dir) = env::var_os(NSS_LIB_PATH) {
        locations.push(PathBuf::from(dir));
    }

    #[cfg(target_os = "windows")]
    {
        if cfg!(target_pointer_width = "32") {
            locations.push(PathBuf::new());
            for dir in [
                r"C:\Program Files (x86)\Mozilla Firefox",
                r"C:\Program Files (x86)\Firefox Developer Edition",
                r"C:\Program Files (x86)\Mozilla Thunderbird",
                r"C:\Program Files (x86)\Nightly",
                r"C:\Program Files (x86)\SeaMonkey",
                r"C:\Program Files (x86)\Waterfox",
            ] {
                locations.push(PathBuf::from(dir));
            }
        }

        locations.push(PathBuf::new());
        if let Some(profile) = env::var_os("USERPROFILE") {
            let local = Path::new(&profile).join(r"AppData\Local");
            for app in [
                "Mozilla Firefox",
                "Firefox Developer Edition",
                "Mozilla Thunderbird",
                "Nightly",
                "SeaMonkey",
                "Waterfox",
            ] {
                locations.push(local.join(app));
            }
        }
        for dir in [
            r"C:\Program Files\Mozilla Firefox",
            r"C:\Program Files\Firefox Developer Edition",
            r"C:\Program Files\Mozilla Thunderbird",
            r"C:\Program Files\Nightly",
            r"C:\Program Files\SeaMonkey",
            r"C:\Program Files\Waterfox",
        ] {
            locations.push(PathBuf::from(dir));
        }

        // Directories of supported browsers found on PATH ship nss3.dll
        // next to the executable.
        locations.extend(browser_dirs_on_path());
    }

    #[cfg(target_os = "macos")]
    {
        locations.push(PathBuf::new());
        for dir in [
            "/usr/local/lib/nss",
            "/usr/local/lib",
            "/opt/local/lib/nss",
            "/sw/lib/firefox",
            "/sw/lib/mozilla",
            "/usr/local/opt/nss/lib",
            "/opt/homebrew/lib",
            "/opt/pkg/lib/nss",
            "/Applications/Firefox.app/Contents/MacOS",
            "/Applications/Thunderbird.app/Contents/MacOS",
            "/Applications/SeaMonkey.app/Contents/MacOS",
            "/Applications/Waterfox.app/Contents/MacOS",
        ] {
            locations.push(PathBuf::from(dir));
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        locations.push(PathBuf::new());
        let dirs: &[&str] = if cfg!(target_pointer_width = "64") {
            &[
                "/usr/lib64",
                "/usr/lib64/nss",
                "/usr/lib",
                "/usr/lib/nss",
                "/usr/local/lib",
                "/usr/local/lib/nss",
                "/opt/local/lib",
                "/opt/local/lib/nss",
            ]
        } else {
            &[
                "/usr/lib",
                "/usr/lib/nss",
                "/usr/lib32",
                "/usr/lib32/nss",
                "/usr/lib64",
                "/usr/lib64/nss",
                "/usr/local/lib",
                "/usr/local/lib/nss",
                "/opt/local/lib",
                "/opt/local/lib/nss",
            ]
        };
        for dir in dirs {
            locations.push(PathBuf::from(dir));
        }
        if let Some(home) = env::var_os("HOME") {
            locations.push(Path::new(&home).join(".nix-profile/lib"));
        }
    }

    locations
}

#[cfg(target_os = "windows")]
fn browser_dirs_on_path() -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Some(path) = env::var_os("PATH") {
        for dir in env::split_paths(&path) {
            for exe in [
                "firefox.exe",
                "thunderbird.exe",
                "waterfox.exe",
                "seamonkey.exe",
            ] {
                if dir.join(exe).is_file() {
                    found.push(dir.clone());
                    break;
                }
            }
        }
    }
    found
}

/// Try each candidate directory in order and return the first library the
/// loader accepts, together with the path it was loaded from.
///
/// Search-path and working-directory mutations made for an attempt are
/// restored before the next attempt starts, success or failure alike.
pub fn locate(candidates: &[PathBuf], library: &str) -> Result<(Library, PathBuf)> {
    let mut attempts: Vec<LoadAttempt> = Vec::new();

    for dir in candidates {
        let target = if dir.as_os_str().is_empty() {
            // Bare file name: the system loader searches its defaults.
            PathBuf::from(library)
        } else {
            if !dir.is_dir() {
                // No point in trying to load from paths that don't exist
                continue;
            }
            dir.join(library)
        };

        debug!("Loading NSS library from {:?}", target);

        // On Windows the loader resolves the DLLs nss3.dll depends on via
        // PATH; macOS dyld behaves similarly for the bundled dylibs. Enter
        // the candidate directory for the duration of this one attempt.
        let _scope = if cfg!(any(target_os = "windows", target_os = "macos"))
            && !dir.as_os_str().is_empty()
        {
            match SearchPathScope::enter("PATH", dir) {
                Ok(scope) => Some(scope),
                Err(e) => {
                    attempts.push(LoadAttempt {
                        path: target,
                        message: e.to_string(),
                    });
                    continue;
                }
            }
        } else {
            None
        };

        match unsafe { Library::new(&target) } {
            Ok(lib) => {
                debug!("Loaded NSS library from {:?}", target);
                return Ok((lib, target));
            }
            Err(e) => attempts.push(LoadAttempt {
                path: target,
                message: e.to_string(),
            }),
        }
    }

    error!(
        "Couldn't find or load '{}'. This library is essential to interact with your Mozilla profile.",
        library
    );
    error!(
        "Try launching this tool from the directory where '{}' is installed, or point NSS_LIB_PATH at it.",
        library
    );
    for attempt in &attempts {
        error!("Error when loading {:?} was {}", attempt.path, attempt.message);
    }

    Err(Error::Discovery {
        library: library.to_string(),
        attempts,
    })
}

/// Scoped mutation of a search-path variable plus the working directory for
/// one load attempt. Both are restored on drop, on every exit path.
struct SearchPathScope {
    var: String,
    saved_value: Option<OsString>,
    saved_cwd: PathBuf,
}

impl SearchPathScope {
    fn enter(var: &str, dir: &Path) -> io::Result<Self> {
        let scope = SearchPathScope {
            var: var.to_string(),
            saved_value: env::var_os(var),
            saved_cwd: env::current_dir()?,
        };

        let mut entries = vec![dir.to_path_buf()];
        if let Some(old) = &scope.saved_value {
            entries.extend(env::split_paths(old));
        }
        let joined = env::join_paths(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        env::set_var(&scope.var, joined);

        // If this fails the partially-entered scope drops and undoes the
        // variable change above.
        env::set_current_dir(dir)?;
        Ok(scope)
    }
}

impl Drop for SearchPathScope {
    fn drop(&mut self) {
        match &self.saved_value {
            Some(value) => env::set_var(&self.var, value),
            None => env::remove_var(&self.var),
        }
        if let Err(e) = env::set_current_dir(&self.saved_cwd) {
            warn!(
                "Failed to restore working directory to {:?}: {}",
                self.saved_cwd, e
            );
        }
    }
}
