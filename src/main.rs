use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{debug, info, LevelFilter};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use layerviz::history::{needs_synthesis, synthesize_from_source};
use layerviz::render::TreeOptions;
use layerviz::{
    containers_to_dot, decode_containers, decode_images, read_input, render_images,
    ConnectionConfig, ConnectionOverrides, DockerSource, ImageRecord, OutputFormat, Source,
    ViewOptions, VizError,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    #[arg(short = 'H', long, global = true, help = "Runtime endpoint (defaults to DOCKER_HOST)")]
    host: Option<String>,

    #[arg(long = "tlsverify", global = true, help = "Use TLS and verify the remote")]
    tls_verify: bool,

    #[arg(long = "tlscacert", global = true, help = "Trust certs signed only by this CA")]
    tls_ca_cert: Option<PathBuf>,

    #[arg(long = "tlscert", global = true, help = "Path to TLS certificate file")]
    tls_cert: Option<PathBuf>,

    #[arg(long = "tlskey", global = true, help = "Path to TLS key file")]
    tls_key: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Visualize docker images.
    Images(ImagesArgs),
    /// Visualize docker containers.
    Containers(ContainersArgs),
}

#[derive(Args)]
struct ImagesArgs {
    #[arg(short, long, help = "Show image information as Graphviz dot")]
    dot: bool,

    #[arg(short, long, help = "Show image information as tree")]
    tree: bool,

    #[arg(short, long, help = "Show short summary of images (repo name and list of tags)")]
    short: bool,

    #[arg(short, long = "no-trunc", help = "Don't truncate the image IDs")]
    no_trunc: bool,

    #[arg(short, long, help = "Display image size as incremental rather than cumulative")]
    incremental: bool,

    #[arg(short = 'c', long = "no-human", help = "Don't humanize the sizes")]
    no_human: bool,

    #[arg(short = 'l', long = "only-labelled", help = "Print only labelled images/containers")]
    only_labelled: bool,

    #[arg(long, help = "Rebuild ancestry from layer history even if parent ids are present")]
    history: bool,

    #[arg(
        short = 'f',
        long,
        env = "LAYERVIZ_INPUT",
        help = "Read image JSON from this file ('-' for stdin) instead of the runtime"
    )]
    input: Option<PathBuf>,

    #[arg(help = "Image id prefix or repo[:tag] to start from")]
    image: Option<String>,
}

#[derive(Args)]
struct ContainersArgs {
    #[arg(short, long, help = "Show container information as Graphviz dot")]
    dot: bool,

    #[arg(short, long = "no-trunc", help = "Don't truncate the container IDs")]
    no_trunc: bool,

    #[arg(
        short = 'f',
        long,
        help = "Read container JSON from this file ('-' for stdin) instead of the runtime"
    )]
    input: Option<PathBuf>,
}

impl ImagesArgs {
    fn format(&self) -> Result<OutputFormat, VizError> {
        match (self.dot, self.tree, self.short) {
            (true, false, false) => Ok(OutputFormat::Dot),
            (false, true, false) => Ok(OutputFormat::Tree),
            (false, false, true) => Ok(OutputFormat::Short),
            (false, false, false) => Err(VizError::Usage(
                "Please specify either --dot, --tree, or --short".to_string(),
            )),
            _ => Err(VizError::Usage(
                "Only one of --dot, --tree or --short may be given".to_string(),
            )),
        }
    }

    /// Whether to rebuild ancestry from layer history. The short summary only reads tags.
    fn wants_history(&self, format: OutputFormat, images: &[ImageRecord]) -> bool {
        format != OutputFormat::Short && (self.history || needs_synthesis(images))
    }
}

impl ContainersArgs {
    fn check(&self) -> Result<(), VizError> {
        if self.dot {
            Ok(())
        } else {
            Err(VizError::Usage("Please specify --dot".to_string()))
        }
    }
}

/// Where records come from: an explicit file, piped stdin, or the live runtime.
fn piped_input(input: &Option<PathBuf>) -> Option<Option<PathBuf>> {
    match input {
        Some(path) => Some(Some(path.clone())),
        None if !std::io::stdin().is_terminal() => Some(None),
        None => None,
    }
}

fn connect(args: &ConnectionArgs) -> Result<DockerSource> {
    let overrides = ConnectionOverrides {
        host: args.host.clone(),
        tls_verify: args.tls_verify,
        tls_ca_cert: args.tls_ca_cert.clone(),
        tls_cert: args.tls_cert.clone(),
        tls_key: args.tls_key.clone(),
    };
    let config = ConnectionConfig::resolve(&overrides)?;
    debug!("Connecting to {}", config.endpoint());
    DockerSource::new(config).context("Failed to initialize the runtime source")
}

fn run_images(args: &ImagesArgs, connection: &ConnectionArgs) -> Result<String> {
    let format = args.format()?;

    let images: Vec<ImageRecord> = match piped_input(&args.input) {
        Some(path) => {
            let raw = read_input(path.as_deref()).context("Failed to read image JSON")?;
            decode_images(&raw)?
        }
        None => {
            let source = connect(connection)?;
            let images = source.list_images()?;
            if args.wants_history(format, &images) {
                info!("Rebuilding image ancestry from layer history");
                synthesize_from_source(&source, &images)?
            } else {
                images
            }
        }
    };

    let options = ViewOptions {
        start: args.image.clone(),
        only_labelled: args.only_labelled,
        tree: TreeOptions {
            no_trunc: args.no_trunc,
            incremental: args.incremental,
            human: !args.no_human,
        },
    };
    Ok(render_images(&images, format, &options)?)
}

fn run_containers(args: &ContainersArgs, connection: &ConnectionArgs) -> Result<String> {
    args.check()?;

    let containers = match piped_input(&args.input) {
        Some(path) => {
            let raw = read_input(path.as_deref()).context("Failed to read container JSON")?;
            decode_containers(&raw)?
        }
        None => connect(connection)?.list_containers()?,
    };

    Ok(containers_to_dot(&containers, args.no_trunc))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity level
    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_env(Env::default())
        .filter_level(log_level)
        .init();

    let output = match &cli.command {
        Commands::Images(args) => run_images(args, &cli.connection)?,
        Commands::Containers(args) => run_containers(args, &cli.connection)?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("Failed to write output")?;
    Ok(())
}
