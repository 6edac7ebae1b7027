use clap::{Parser, Subcommand};
use multistream::container::{Container, PackOptions};
use multistream::flags::ItemFlags;
use multistream::integrity::IntegrityAlgorithm;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mstream", about = "Multi-stream container CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into a container, one sub-stream per file
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// 12-bit type code stored on every item (0-4095)
        #[arg(short = 't', long = "type", default_value = "0")]
        type_code: u16,
        /// Store items gzip-compressed
        #[arg(short, long)]
        gzip: bool,
        /// Append an integrity digest to every item
        #[arg(short, long)]
        assured: bool,
        /// gzip level 0-9
        #[arg(short, long, default_value = "6")]
        level: u32,
        /// Digest algorithm for assured items: blake3 (default), crc32
        #[arg(long, default_value = "blake3")]
        integrity: String,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List the item directory
    List {
        input: PathBuf,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write one item's decoded bytes to stdout
    Cat {
        input: PathBuf,
        index: usize,
    },
    /// Verify every assured item
    Verify {
        input: PathBuf,
    },
    /// Show container metadata
    Info {
        input: PathBuf,
    },
    /// Extract every item into a directory
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, type_code, gzip, assured, level, integrity, input } => {
            let opts = PackOptions {
                compression_level: level,
                integrity:         parse_integrity(&integrity),
            };
            let mut flags = ItemFlags::empty();
            if gzip    { flags |= ItemFlags::GZIPPED; }
            if assured { flags |= ItemFlags::ASSURED; }

            let mut c = Container::create(&output, opts)?;
            for path in &input {
                let data = std::fs::read(path)?;
                let index = c.add(type_code, flags, &data)?;
                println!("  [{index}] packed  {}", path.display());
            }
            c.finalize()?;
            println!("Created: {}", output.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let c = Container::open(&input)?;
            let items = c.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("{:>5} {:>12} {:>12} {:>3} {:>5}  Flags",
                         "Index", "Offset", "Length", "Ver", "Type");
                for i in items {
                    let flags = match (i.gzipped, i.assured) {
                        (true, true)   => "gzip,assured",
                        (true, false)  => "gzip",
                        (false, true)  => "assured",
                        (false, false) => "-",
                    };
                    println!("{:>5} {:>12} {:>12} {:>3} {:>5}  {}",
                        i.index, i.offset, i.length, i.version, i.type_code, flags);
                }
            }
        }

        // ── Cat ──────────────────────────────────────────────────────────────
        Commands::Cat { input, index } => {
            let mut c = Container::open(&input)?;
            let data = c.read(index)?;
            std::io::stdout().lock().write_all(&data)?;
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let mut c = Container::open(&input)?;
            let failures = c.verify()?;
            let assured = c.list().iter().filter(|i| i.assured).count();
            for (index, err) in &failures {
                println!("  FAILED [{index}] {err}");
            }
            println!("{} of {} assured item(s) verified", assured - failures.len(), assured);
            if !failures.is_empty() {
                std::process::exit(1);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let c = Container::open(&input)?;
            let sb = c.superblock();
            let items = c.list();
            let v2 = items.iter().filter(|i| i.version == 2).count();

            println!("── Container ────────────────────────────────────────────");
            println!("  Path             {}", input.display());
            println!("  Format version   {}", sb.format_version);
            println!("  UUID             {}", c.uuid());
            println!("  Integrity        {}", c.integrity().name());
            println!("  Directory offset {} B", sb.directory_offset);
            println!("  Directory size   {} B", sb.directory_size);
            println!("  Items            {} ({} v1, {} v2)", items.len(), items.len() - v2, v2);
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir } => {
            let mut c = Container::open(&input)?;
            let written = c.extract_all(&output_dir)?;
            println!("Extracted {} item(s) to: {}", written.len(), output_dir.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_integrity(s: &str) -> IntegrityAlgorithm {
    IntegrityAlgorithm::from_name(s).unwrap_or_else(|| {
        tracing::warn!(requested = s, "unknown integrity algorithm, defaulting to blake3");
        IntegrityAlgorithm::Blake3
    })
}
