use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rsa_encrypt::config::DEFAULT_MARKER;
use rsa_encrypt::{Commands, Config};

#[derive(Parser, Debug)]
#[command(name = "rsa-encrypt", version, about = "Encrypt files and directories in place with RSA")]
struct Args {
    /// Directory holding keys.txt
    #[arg(long, env = "KEYDIR", global = true)]
    key_dir: Option<PathBuf>,

    /// Filename suffix marking encrypted files
    #[arg(long, default_value = DEFAULT_MARKER, global = true)]
    marker: String,

    /// Log every file transition
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair; SIZE is rounded down to a power of two (default 2048)
    Keygen { size: Option<u32> },
    /// Encrypt a file, or every file under a directory
    Encrypt { path: PathBuf },
    /// Decrypt a file, or every file under a directory
    Decrypt { path: PathBuf },
    /// Encrypt a string and print the ciphertext tokens
    EncryptText { text: String },
    /// Decrypt a string of ciphertext tokens
    DecryptText { ciphertext: String },
    /// Print the stored key record
    ShowKey,
}

fn main() {
    // KEYDIR may also come from a .env file
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let default_filter = if args.verbose {
        "rsa_encrypt=debug"
    } else {
        "rsa_encrypt=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let key_dir = args
        .key_dir
        .context("no key directory configured; set KEYDIR or pass --key-dir")?;
    let commands = Commands::new(Config::new(key_dir).with_marker(args.marker));

    match args.command {
        Command::Keygen { size } => {
            let keypair = commands.keygen(size)?;
            println!(
                "key generation successful (length: {} bits)",
                keypair.bit_length()
            );
        }
        Command::Encrypt { path } => {
            let report = commands
                .encrypt(&path)
                .with_context(|| format!("encrypting {}", path.display()))?;
            println!(
                "encrypted {} file(s), skipped {}",
                report.transformed.len(),
                report.skip_count()
            );
        }
        Command::Decrypt { path } => {
            let report = commands
                .decrypt(&path)
                .with_context(|| format!("decrypting {}", path.display()))?;
            println!(
                "decrypted {} file(s), skipped {}",
                report.transformed.len(),
                report.skip_count()
            );
        }
        Command::EncryptText { text } => println!("{}", commands.encrypt_text(&text)?),
        Command::DecryptText { ciphertext } => println!("{}", commands.decrypt_text(&ciphertext)?),
        Command::ShowKey => {
            let keypair = commands.show_key()?;
            println!("created:     {}", keypair.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("bits:        {}", keypair.bit_length());
            println!("fingerprint: {}", keypair.public_key.fingerprint());
            println!("public key:  {}, {}", keypair.public_key.e, keypair.public_key.n);
        }
    }

    Ok(())
}
