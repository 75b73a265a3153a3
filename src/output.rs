//! Rendering of recovered credentials.
//!
//! Human-readable blocks for the terminal, plus CSV and JSON for feeding
//! other tools.

use anyhow::Result;

use crate::pipeline::DecryptedEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Csv,
}

pub fn render(entries: &[DecryptedEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(render_human(entries)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)? + "\n"),
        OutputFormat::Csv => Ok(render_csv(entries)),
    }
}

fn render_human(entries: &[DecryptedEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "\n\tWebsite:   {}\n\tUsername: '{}'\n\tPassword: '{}'\n",
            entry.url, entry.username, entry.password
        ));
    }
    out
}

fn render_csv(entries: &[DecryptedEntry]) -> String {
    let mut out = String::from("url,username,password\n");
    for entry in entries {
        out.push_str(&format!(
            "\"{}\",\"{}\",\"{}\"\n",
            entry.url.replace('"', "\"\""),
            entry.username.replace('"', "\"\""),
            entry.password.replace('"', "\"\"")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, username: &str, password: &str) -> DecryptedEntry {
        DecryptedEntry {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn human_format_matches_the_classic_block() {
        let entries = vec![entry("https://example.com", "jdoe", "hunter2")];
        let rendered = render(&entries, OutputFormat::Human).unwrap();
        assert_eq!(
            rendered,
            "\n\tWebsite:   https://example.com\n\tUsername: 'jdoe'\n\tPassword: 'hunter2'\n"
        );
    }

    #[test]
    fn csv_escapes_embedded_quotes() {
        let entries = vec![entry("https://example.com", "jd\"oe", "pa,ss")];
        let rendered = render(&entries, OutputFormat::Csv).unwrap();
        assert_eq!(
            rendered,
            "url,username,password\n\"https://example.com\",\"jd\"\"oe\",\"pa,ss\"\n"
        );
    }

    #[test]
    fn json_round_trips() {
        let entries = vec![
            entry("https://a.example", "u1", "p1"),
            entry("https://b.example", "u2", "p2"),
        ];
        let rendered = render(&entries, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["url"], "https://a.example");
        assert_eq!(parsed[1]["password"], "p2");
    }
}
