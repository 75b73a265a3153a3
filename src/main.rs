use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod credentials;
mod error;
mod nss;
mod output;
mod pipeline;
mod profiles;
mod prompt;

use error::Error;
use nss::{DecryptionMode, NssContext};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "firefox-credential-dump")]
#[command(about = "Recover stored website credentials from Mozilla browser profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Base directory containing profiles.ini (defaults to the platform's
    /// Firefox data directory)
    basepath: Option<PathBuf>,

    /// List the profiles found in profiles.ini and exit
    #[arg(short, long)]
    list: bool,

    /// Never prompt at the terminal; read the primary password from stdin
    #[arg(short = 'n', long)]
    no_interactive: bool,

    /// Output format: human, json or csv
    #[arg(short = 'F', long, default_value = "human")]
    format: String,

    /// Abort a profile on the first record that fails to decrypt instead
    /// of substituting a failure marker
    #[arg(long)]
    strict_decryption: bool,

    /// Verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let format = match cli.format.to_lowercase().as_str() {
        "human" => OutputFormat::Human,
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        _ => {
            eprintln!(
                "❌ Invalid output format: {}. Use 'human', 'json' or 'csv'",
                cli.format
            );
            std::process::exit(1);
        }
    };

    let basepath = match cli.basepath.or_else(profiles::default_base_path) {
        Some(path) => path,
        None => {
            eprintln!("❌ Could not determine the Firefox data directory; pass it explicitly");
            std::process::exit(1);
        }
    };

    let sections = profiles::read_profiles(&basepath)?;

    if cli.list {
        for (index, profile) in sections.iter().enumerate() {
            println!("{} -> {}", index + 1, profile.display());
        }
        return Ok(());
    }

    let mode = if cli.strict_decryption {
        DecryptionMode::Strict
    } else {
        DecryptionMode::Lenient
    };
    let interactive = !cli.no_interactive;

    // One full NSS cycle per profile; a failed profile is reported and the
    // loop moves on to the next one.
    for profile in sections {
        println!("Profile {}", profile.display());
        match dump_profile(&profile, interactive, mode, format) {
            Ok(()) => println!(),
            Err(e) => {
                error!("{}", e);
                eprintln!("Invalid profile ({})", profile.display());
            }
        }
    }

    Ok(())
}

/// Process a single profile: initialize NSS against it, unlock the store,
/// decrypt every stored credential, render, and shut the session down.
fn dump_profile(
    profile: &Path,
    interactive: bool,
    mode: DecryptionMode,
    format: OutputFormat,
) -> Result<()> {
    if !profile.is_dir() {
        error!(
            "Profile location {:?} is not a directory. Has profiles.ini been tampered with?",
            profile
        );
        return Err(Error::BadProfile(profile.to_path_buf()).into());
    }

    let ctx = NssContext::initialize(profile, mode)?;
    info!("Loaded NSS from {:?}", ctx.library_path());
    ctx.authenticate(interactive)?;

    // On any failure below the context drops and shuts the session down;
    // output already printed for earlier profiles is unaffected.
    let mut source = credentials::open_source(profile)?;
    let entries = pipeline::run(source.as_mut(), &ctx)?;

    info!("Recovered {} credentials from {:?}", entries.len(), profile);
    print!("{}", output::render(&entries, format)?);

    ctx.shutdown()?;
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
