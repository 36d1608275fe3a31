//! `ferrum`: convert FHIR resources between JSON and XML and check that they decode.

mod config;
mod logging;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ferrum_context::FhirVersion;
use ferrum_format::{DecodeOptions, EncodeOptions, FhirCodec, Format};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "ferrum", version, about = "FHIR JSON/XML converter")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level for the ferrum crates (overridden by RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a resource and encode it in the requested grammar
    Convert(ConvertArgs),
    /// Decode a resource and report what it holds
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct DecodeArgs {
    /// Input file, or `-` for stdin
    input: PathBuf,

    /// Input grammar; inferred from the file extension when omitted
    #[arg(long)]
    from: Option<Format>,

    /// FHIR release the resource follows
    #[arg(long, value_name = "VERSION")]
    fhir_version: Option<FhirVersion>,

    /// Fail on unknown elements instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Keep comments from the input
    #[arg(long)]
    preserve_comments: bool,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    decode: DecodeArgs,

    /// Output grammar; defaults to the other grammar
    #[arg(long)]
    to: Option<Format>,

    /// Indent the output
    #[arg(long)]
    pretty: bool,

    /// Emit only summary elements
    #[arg(long)]
    summary: bool,

    /// Leave out narrative text
    #[arg(long)]
    suppress_narrative: bool,

    /// Leave out the resource id
    #[arg(long)]
    omit_resource_id: bool,

    /// Only encode these element paths (`Patient.name`)
    #[arg(long = "include", value_name = "PATH")]
    include: Vec<String>,

    /// Never encode these element paths (`*.meta`)
    #[arg(long = "exclude", value_name = "PATH")]
    exclude: Vec<String>,

    /// Write to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    decode: DecodeArgs,

    /// Require this resource type
    #[arg(long, value_name = "TYPE")]
    resource_type: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= cli.log_json;
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Convert(args) => convert(&config, args),
        Command::Check(args) => check(&config, args),
    }
}

fn convert(config: &CliConfig, args: ConvertArgs) -> anyhow::Result<()> {
    let (text, from) = read_input(&args.decode)?;
    let to = args
        .to
        .or(config.output_format)
        .unwrap_or(match from {
            Format::Json => Format::Xml,
            Format::Xml => Format::Json,
        });
    let codec = FhirCodec::core(args.decode.fhir_version.unwrap_or(config.fhir_version));

    let decode = decode_options(config, &args.decode);
    let encode = encode_options(config, &args);
    tracing::info!(%from, %to, input = %args.decode.input.display(), "Converting resource");

    let output = codec
        .convert(&text, from, to, &decode, &encode)
        .with_context(|| format!("Failed to convert {}", args.decode.input.display()))?;

    match &args.output {
        Some(path) => fs::write(path, output.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn check(config: &CliConfig, args: CheckArgs) -> anyhow::Result<()> {
    let (text, from) = read_input(&args.decode)?;
    let codec = FhirCodec::core(args.decode.fhir_version.unwrap_or(config.fhir_version));
    let decode = decode_options(config, &args.decode);

    let resource = codec
        .decode(&text, from, &decode, args.resource_type.as_deref())
        .with_context(|| format!("{} is not a valid resource", args.decode.input.display()))?;

    println!(
        "{}: {}{} ({} contained)",
        args.decode.input.display(),
        resource.resource_type(),
        resource.id().map(|id| format!("/{id}")).unwrap_or_default(),
        resource.contained().count()
    );
    Ok(())
}

/// Read the input and settle its grammar.
fn read_input(args: &DecodeArgs) -> anyhow::Result<(String, Format)> {
    let text = if args.input == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        text
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("Failed to read {}", args.input.display()))?
    };

    let format = match args.from.or_else(|| Format::from_path(&args.input)) {
        Some(format) => format,
        None => match sniff_format(&text) {
            Some(format) => format,
            None => bail!(
                "Cannot tell whether {} is JSON or XML; pass --from",
                args.input.display()
            ),
        },
    };
    Ok((text, format))
}

/// First non-whitespace character: `{` for JSON, `<` for XML.
fn sniff_format(text: &str) -> Option<Format> {
    match text.trim_start().chars().next()? {
        '{' => Some(Format::Json),
        '<' => Some(Format::Xml),
        _ => None,
    }
}

fn decode_options(config: &CliConfig, args: &DecodeArgs) -> DecodeOptions {
    let mut options: DecodeOptions = config.decode.clone();
    options.strict |= args.strict;
    options.preserve_comments |= args.preserve_comments;
    options
}

fn encode_options(config: &CliConfig, args: &ConvertArgs) -> EncodeOptions {
    let mut options: EncodeOptions = config.encode.clone();
    options.pretty |= args.pretty;
    options.summary |= args.summary;
    options.suppress_narrative |= args.suppress_narrative;
    options.omit_resource_id |= args.omit_resource_id;
    options.preserve_comments |= args.decode.preserve_comments;
    options.include.extend(args.include.iter().cloned());
    options.exclude.extend(args.exclude.iter().cloned());
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_flags() {
        let cli = Cli::try_parse_from([
            "ferrum",
            "convert",
            "patient.json",
            "--to",
            "xml",
            "--summary",
            "--exclude",
            "*.meta",
            "--exclude",
            "*.id",
            "--fhir-version",
            "stu3",
        ])
        .unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.to, Some(Format::Xml));
        assert!(args.summary);
        assert_eq!(args.exclude, vec!["*.meta", "*.id"]);
        assert_eq!(args.decode.fhir_version, Some(FhirVersion::Stu3));

        let options = encode_options(&CliConfig::default(), &args);
        assert!(options.summary);
        assert_eq!(options.exclude, vec!["*.meta", "*.id"]);
    }

    #[test]
    fn flags_add_to_configured_options() {
        let mut config = CliConfig::default();
        config.encode.exclude.push("*.text".to_string());
        config.decode.strict = true;
        let args = DecodeArgs {
            input: PathBuf::from("x.xml"),
            preserve_comments: true,
            ..DecodeArgs::default()
        };
        let decode = decode_options(&config, &args);
        assert!(decode.strict);
        assert!(decode.preserve_comments);
    }

    #[test]
    fn sniffs_grammar_from_content() {
        assert_eq!(sniff_format("  {\"resourceType\":\"Patient\"}"), Some(Format::Json));
        assert_eq!(sniff_format("\n<Patient/>"), Some(Format::Xml));
        assert_eq!(sniff_format("Patient"), None);
    }

    #[test]
    fn converts_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patient.json");
        let output = dir.path().join("patient.xml");
        fs::write(&input, r#"{"resourceType":"Patient","id":"1","active":true}"#).unwrap();

        let cli = Cli::try_parse_from([
            "ferrum",
            "convert",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        convert(&CliConfig::default(), args).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            r#"<Patient xmlns="http://hl7.org/fhir"><id value="1"/><active value="true"/></Patient>"#
        );
    }
}
