//! eventwire command-line entry point

use clap::{Args, Parser, Subcommand, ValueEnum};
use eventwire::codegen::{Generator, GeneratorOptions, Side};
use eventwire::config::ServiceConfig;
use eventwire::dispatch::{DispatchError, Dispatcher, DynamicMessage, ProtocolUnion};
use eventwire::observability::{init_default_logging, LogFormat};
use eventwire::registry::FnHandler;
use eventwire::schema::{parse_file, Protocol};
use eventwire::server::GenerationService;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

/// Schema-first event protocols: generate typed code and validate messages
#[derive(Parser)]
#[command(name = "eventwire")]
#[command(about = "Schema-first event protocol definitions and code generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from a protocol definition
    Generate(GenerateArgs),
    /// Validate a protocol definition and summarize its events
    Validate {
        /// Protocol definition (YAML, or JSON with a .json extension)
        input: PathBuf,

        /// Show every event and field
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate one wire message against a protocol
    Check {
        /// Protocol definition
        protocol: PathBuf,

        /// Message JSON, or `-` to read stdin
        message: String,

        /// Side that receives the message
        #[arg(long, value_enum, default_value_t = SideArg::Server)]
        side: SideArg,

        /// Discriminator field name
        #[arg(long, default_value = "type")]
        discriminator: String,
    },
    /// Run the demo generation service
    Serve {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE", env = "EVENTWIRE_CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Protocol definition (YAML, or JSON with a .json extension)
    input: PathBuf,

    /// Output path: a `.rs` file for one combined source, otherwise a directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_server: bool,

    #[arg(long)]
    no_client: bool,

    #[arg(long)]
    no_webclient: bool,

    /// Put the TypeScript module under client/ instead of webclient/
    #[arg(long)]
    integrate_webclient: bool,
}

impl GenerateArgs {
    fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            include_server: !self.no_server,
            include_client: !self.no_client,
            include_webclient: !self.no_webclient,
            integrate_webclient: self.integrate_webclient,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Server,
    Client,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Server => Side::Server,
            SideArg::Client => Side::Client,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_format = match cli.command {
        Commands::Serve { .. } => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    init_default_logging(default_format);

    let result = match cli.command {
        Commands::Generate(args) => run_generate(&args),
        Commands::Validate { input, verbose } => run_validate(&input, verbose),
        Commands::Check {
            protocol,
            message,
            side,
            discriminator,
        } => run_check(&protocol, &message, side.into(), &discriminator),
        Commands::Serve { config, port } => run_serve(config, port).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn load_protocol(path: &Path) -> Result<Protocol, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    Ok(parse_file(path)?)
}

fn run_generate(args: &GenerateArgs) -> CliResult {
    let protocol = load_protocol(&args.input)?;
    let generator = Generator::new(&protocol);

    match &args.output {
        None => print!("{}", generator.generate()?),
        Some(path)
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("rs")) =>
        {
            let source = generator.generate()?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, source)?;
            println!("Generated: {}", path.display());
        }
        Some(dir) => {
            for path in generator.write_all(dir, &args.options())? {
                println!("Generated: {}", path.display());
            }
        }
    }

    Ok(())
}

fn run_validate(input: &Path, verbose: bool) -> CliResult {
    let protocol = load_protocol(input)?;
    Generator::new(&protocol).check()?;

    println!("Protocol: {}", protocol.name);
    if let Some(version) = &protocol.version {
        println!("Version: {version}");
    }
    println!("Events: {}", protocol.events.len());
    println!(
        "  Client -> Server: {}",
        protocol.client_to_server_events().len()
    );
    println!(
        "  Server -> Client: {}",
        protocol.server_to_client_events().len()
    );

    if verbose {
        println!("\nEvents:");
        for event in &protocol.events {
            println!("  - {} ({})", event.name, event.direction);
            for field in &event.fields {
                let optional = if field.required { "" } else { " (optional)" };
                println!("      {}: {}{optional}", field.name, field.type_name);
            }
        }
    }

    println!("\nProtocol is valid.");
    Ok(())
}

fn run_check(protocol_path: &Path, message: &str, side: Side, discriminator: &str) -> CliResult {
    let protocol = load_protocol(protocol_path)?;
    let union = ProtocolUnion::with_discriminator(&protocol, side, discriminator)?;
    let handler = FnHandler::<DynamicMessage>::builder().build();
    let dispatcher = Dispatcher::new(union, Arc::new(handler));

    let raw = if message == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        message.to_string()
    };

    match dispatcher.parse(raw) {
        Ok(parsed) => {
            println!("Valid '{}' message", parsed.kind);
            println!("{}", serde_json::to_string_pretty(&parsed.message.payload)?);
            Ok(())
        }
        Err(err) => {
            print_dispatch_error(&err);
            Err(err.into())
        }
    }
}

fn print_dispatch_error(err: &DispatchError) {
    println!("Invalid message ({}): {}", err.label(), err);
    for field in err.field_errors() {
        println!("  {field}");
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> CliResult {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            ServiceConfig::load_from_file(&path)?
        }
        None => {
            let default_path = PathBuf::from("eventwire.toml");
            if default_path.exists() {
                info!("Loading configuration from: {}", default_path.display());
                ServiceConfig::load_from_file(&default_path)?
            } else {
                ServiceConfig::default()
            }
        }
    };

    if let Some(port) = port {
        config.server.port = port;
    }

    info!("Starting eventwire service v{}", env!("CARGO_PKG_VERSION"));
    Arc::new(GenerationService::new(config)).start().await?;
    Ok(())
}
