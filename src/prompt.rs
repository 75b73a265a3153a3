//! Primary password input.
//!
//! Attended runs prompt at the terminal without echoing; unattended runs
//! read one line from stdin so the password can be piped in.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use crate::error::Result;

pub fn ask_primary_password(profile: &Path, interactive: bool) -> Result<String> {
    if io::stdin().is_terminal() && interactive {
        let message = format!("\nPrimary Password for profile {}: ", profile.display());
        return Ok(rpassword::prompt_password(message)?);
    }

    let mut stderr = io::stderr();
    writeln!(stderr, "Reading Primary password from standard input:")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line
        .trim_end_matches('\n')
        .trim_end_matches('\r')
        .to_string())
}
