use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use fdgh_core::convert::{self, Inspection};
use fdgh_core::xbin::{self, XBIN_MAGIC};
use fdgh_core::{Collation, EncodeOptions, XbinConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CollationArg {
    Legacy,
    Current,
}

#[derive(Debug, Parser)]
#[command(name = "fdgh", author, version, about)]
struct Cli {
    /// Log section offsets and detected modes.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a binary FDGH file to XML, or XML back to binary.
    Convert {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
        /// Sort order for the asset table when writing binary.
        #[arg(long, value_enum, default_value_t = CollationArg::Current)]
        collation: CollationArg,
    },
    /// Strip the XBIN container and print its configuration string.
    Unpack {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Wrap raw bytes in an XBIN container.
    Pack {
        input: PathBuf,
        #[arg(value_name = "VERSION,ENDIANNESS,METADATA", value_parser = parse_config)]
        config: XbinConfig,
        output: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Summarize a binary FDGH file.
    Inspect {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    ToXml,
    ToBinary,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Convert {
            input,
            output,
            overwrite,
            collation,
        } => run_convert(&input, output, overwrite, to_core_collation(collation)),
        Command::Unpack {
            input,
            output,
            overwrite,
        } => run_unpack(&input, output, overwrite),
        Command::Pack {
            input,
            config,
            output,
            overwrite,
        } => run_pack(&input, &config, output, overwrite),
        Command::Inspect { input, json } => run_inspect(&input, json),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_convert(input: &Path, output: Option<PathBuf>, overwrite: bool, collation: Collation) {
    let bytes = read_input(input);
    let direction = sniff(input, &bytes);
    debug!(?direction, "detected input kind");

    match direction {
        Direction::ToXml => {
            let out_path = resolve_output(output, input.with_extension("xml"), overwrite);
            info!("Converting FDGH to XML");
            let xml = convert::binary_to_xml(&bytes).unwrap_or_else(|e| {
                fail(format_args!("Error converting {}: {e}", input.display()))
            });
            write_output(&out_path, xml.as_bytes());
        }
        Direction::ToBinary => {
            let out_path = resolve_output(output, input.with_extension("dat"), overwrite);
            info!("Converting XML to FDGH");
            let xml = convert::xml_from_bytes(&bytes).unwrap_or_else(|e| {
                fail(format_args!("Error reading {}: {e}", input.display()))
            });
            let binary = convert::xml_to_binary(xml, &EncodeOptions { collation })
                .unwrap_or_else(|e| {
                    fail(format_args!("Error converting {}: {e}", input.display()))
                });
            write_output(&out_path, &binary);
        }
    }
    info!("Done");
}

fn run_unpack(input: &Path, output: Option<PathBuf>, overwrite: bool) {
    let bytes = read_input(input);
    let unwrapped = xbin::unwrap(&bytes).unwrap_or_else(|e| {
        fail(format_args!("Error unpacking {}: {e}", input.display()))
    });
    let config = XbinConfig {
        version: unwrapped.version,
        endianness: unwrapped.endianness,
        metadata: unwrapped.metadata,
    };

    let out_path = resolve_output(output, sibling(input, "unpacked.bin"), overwrite);
    write_output(&out_path, unwrapped.payload);
    println!("{config}");
}

fn run_pack(input: &Path, config: &XbinConfig, output: Option<PathBuf>, overwrite: bool) {
    let bytes = read_input(input);
    let packed = xbin::wrap(config.endianness, &bytes, config.metadata, config.version)
        .unwrap_or_else(|e| fail(format_args!("Error packing {}: {e}", input.display())));

    let out_path = resolve_output(output, sibling(input, "packed.bin"), overwrite);
    write_output(&out_path, &packed);
}

fn run_inspect(input: &Path, json: bool) {
    let bytes = read_input(input);
    let inspection = convert::inspect(&bytes).unwrap_or_else(|e| {
        fail(format_args!("Error parsing {}: {e}", input.display()))
    });

    if json {
        let rendered = serde_json::to_string_pretty(&inspection.report()).unwrap_or_else(|e| {
            fail(format_args!("Error rendering JSON output: {e}"))
        });
        println!("{rendered}");
    } else {
        print_summary(&inspection);
    }
}

fn print_summary(inspection: &Inspection) {
    let summary = inspection.document.summary();
    println!(
        "Container:    XBIN v{}, {} endian, metadata {:#x}",
        summary.xbin_version, summary.endianness, inspection.metadata
    );
    println!(
        "Strings:      {} null terminator(s), asset hashes {}",
        summary.num_string_null_terminators,
        summary.asset_name_hashes.as_deref().unwrap_or("none")
    );
    println!(
        "World map:    value {}, {} entries",
        summary.world_map_value, summary.world_map_entries
    );
    println!(
        "Rooms:        {} ({} links, {} asset references)",
        summary.room_count, summary.link_count, summary.asset_reference_count
    );
    println!("Assets:       {} distinct", summary.distinct_asset_count);
    println!("Layout:");
    for section in &inspection.layout.sections {
        println!(
            "  {:<10} 0x{:06x}..0x{:06x} ({} bytes)",
            format!("{:?}", section.id),
            section.range.start,
            section.range.end,
            section.range.len()
        );
    }
    for gap in inspection.layout.gaps() {
        println!(
            "  {:<10} 0x{:06x}..0x{:06x} ({} bytes)",
            "(unused)",
            gap.start,
            gap.end,
            gap.len()
        );
    }
}

/// XBIN magic means binary; a leading `<` means XML. Anything else is
/// decided by the file extension.
fn sniff(path: &Path, bytes: &[u8]) -> Direction {
    if bytes.starts_with(XBIN_MAGIC) {
        return Direction::ToXml;
    }
    let text = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if text.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<') {
        return Direction::ToBinary;
    }
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if is_xml {
        Direction::ToBinary
    } else {
        Direction::ToXml
    }
}

/// `<dir>/<stem>.<suffix>` next to the input.
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.{suffix}"))
}

fn resolve_output(explicit: Option<PathBuf>, default: PathBuf, overwrite: bool) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if default.exists() && !overwrite {
        fail(format_args!(
            "{} already exists; pass --overwrite or name an output path",
            default.display()
        ));
    }
    default
}

fn read_input(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| fail(format_args!("Error reading {}: {e}", path.display())))
}

fn write_output(path: &Path, bytes: &[u8]) {
    fs::write(path, bytes)
        .unwrap_or_else(|e| fail(format_args!("Error writing {}: {e}", path.display())));
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
}

fn fail(message: impl Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn parse_config(value: &str) -> Result<XbinConfig, String> {
    value.parse::<XbinConfig>().map_err(|e| e.to_string())
}

fn to_core_collation(collation: CollationArg) -> Collation {
    match collation {
        CollationArg::Legacy => Collation::Legacy,
        CollationArg::Current => Collation::Current,
    }
}
