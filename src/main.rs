//! # Greetcard CLI
//!
//! Command-line interface for greeting links and the bundled blob server.
//!
//! ## Usage
//!
//! ```bash
//! # Run a self-hosted blob store
//! greetcard serve --listen 0.0.0.0:8080 --data-dir ./greetings
//!
//! # Turn a greeting JSON file into a shareable #data= link
//! greetcard encode card.json --base-url https://cards.example/
//!
//! # Read a greeting back out of a link
//! greetcard decode 'https://cards.example/#data=eyJuYW1lIjoi...'
//!
//! # Upload to a remote store and print the ?id= link
//! greetcard publish card.json --backend bytebin:http://localhost:8080
//!
//! # Download a stored greeting
//! greetcard fetch Ab3dE9x --backend bytebin:http://localhost:8080
//!
//! # Resize a photo into an embeddable data URL
//! greetcard resize photo.jpg --profile embedded
//! ```

use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use greetcard::{
    GreetcardError, GreetingDocument,
    config::BackendConfig,
    image_codec::{ImageCodec, ImageProfile},
    location,
    server::{self, ServerConfig},
    token::{TokenCodec, TokenFormat},
};

/// Greetcard - Shareable birthday slideshow utility
#[derive(Parser, Debug)]
#[command(name = "greetcard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bytebin-compatible blob server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Directory greetings are stored in
        #[arg(long, default_value = "./greetings")]
        data_dir: PathBuf,

        /// Largest accepted upload in bytes
        #[arg(long, default_value_t = server::DEFAULT_MAX_BLOB_BYTES)]
        max_bytes: usize,
    },

    /// Encode a greeting JSON file into a #data= link
    Encode {
        /// Greeting JSON file
        file: PathBuf,

        /// Page the link points at
        #[arg(long, default_value = "http://localhost:5173/")]
        base_url: String,

        /// Token format (escaped, compressed)
        #[arg(long, default_value = "escaped")]
        format: TokenFormat,

        /// Print only the token instead of a full link
        #[arg(long)]
        token_only: bool,
    },

    /// Decode a #data= link or bare token into greeting JSON
    Decode {
        /// Link or token
        input: String,
    },

    /// Upload a greeting JSON file and print its ?id= link
    Publish {
        /// Greeting JSON file
        file: PathBuf,

        /// Remote store (local:<dir>, bytebin[:<url>], jsonblob[:<url>])
        #[arg(long, default_value = "bytebin")]
        backend: BackendConfig,

        /// Page the link points at
        #[arg(long, default_value = "http://localhost:5173/")]
        base_url: String,
    },

    /// Download a stored greeting as JSON
    Fetch {
        /// Greeting id
        id: String,

        /// Remote store (local:<dir>, bytebin[:<url>], jsonblob[:<url>])
        #[arg(long, default_value = "bytebin")]
        backend: BackendConfig,
    },

    /// Resize an image into an embeddable JPEG data URL
    Resize {
        /// Image file
        file: PathBuf,

        /// Size profile (embedded, upload)
        #[arg(long, default_value = "embedded")]
        profile: ImageProfile,

        /// Write the data URL to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), GreetcardError> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Serve {
            listen,
            data_dir,
            max_bytes,
        } => {
            let mut config = ServerConfig::new(listen, data_dir);
            config.max_blob_bytes = max_bytes;
            runtime.block_on(server::serve(config))
        }

        Commands::Encode {
            file,
            base_url,
            format,
            token_only,
        } => {
            let doc = read_document(&file)?;
            let token = TokenCodec::new(format, usize::MAX).encode(&doc)?;
            if token_only {
                println!("{}", token);
            } else {
                println!("{}", location::with_token(&parse_url(&base_url)?, &token));
            }
            Ok(())
        }

        Commands::Decode { input } => {
            let token = match Url::parse(&input) {
                Ok(url) => location::token_in(&url)
                    .map(str::to_string)
                    .ok_or_else(|| GreetcardError::Decode("link has no #data= token".to_string()))?,
                Err(_) => input.trim_start_matches("#data=").to_string(),
            };
            let doc = TokenCodec::new(TokenFormat::default(), usize::MAX).decode(&token)?;
            print_document(&doc)
        }

        Commands::Publish {
            file,
            backend,
            base_url,
        } => {
            let doc = read_document(&file)?;
            let store = backend.build()?.ok_or_else(|| {
                GreetcardError::StoreUnavailable("publish needs a backend".to_string())
            })?;
            let id = runtime.block_on(store.save(&doc))?;
            eprintln!("Saved to {} as {}", store.name(), id);
            println!("{}", location::with_reference(&parse_url(&base_url)?, &id));
            Ok(())
        }

        Commands::Fetch { id, backend } => {
            let store = backend.build()?.ok_or_else(|| {
                GreetcardError::StoreUnavailable("fetch needs a backend".to_string())
            })?;
            let doc = runtime.block_on(store.load(&id))?;
            print_document(&doc)
        }

        Commands::Resize { file, profile, out } => {
            let raw = std::fs::read(&file)?;
            let data_url = runtime.block_on(ImageCodec::new(profile).resize(raw))?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &data_url)?;
                    eprintln!("Wrote {} bytes to {}", data_url.len(), path.display());
                }
                None => println!("{}", data_url),
            }
            Ok(())
        }
    }
}

fn read_document(path: &Path) -> Result<GreetingDocument, GreetcardError> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GreetcardError::Decode(format!("{}: {}", path.display(), e)))
}

fn print_document(doc: &GreetingDocument) -> Result<(), GreetcardError> {
    let json = serde_json::to_string_pretty(doc)
        .map_err(|e| GreetcardError::Decode(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn parse_url(s: &str) -> Result<Url, GreetcardError> {
    Url::parse(s).map_err(|e| GreetcardError::InvalidUrl(format!("{}: {}", s, e)))
}
