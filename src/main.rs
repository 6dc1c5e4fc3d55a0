use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use invoice_mapper::cli;
use invoice_mapper::config::MapperConfig;
use invoice_mapper::mapping::InvoiceMapper;
use invoice_mapper::server;

#[derive(Parser)]
#[command(
    name = "invoice-mapper",
    version,
    about = "Map invoice line items to a candidate list using OCR, an LLM and confirmed-mapping memory",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    map: MapCli,
}

/// Process one invoice file and review the suggestions interactively.
#[derive(Args)]
struct MapCli {
    /// Invoice file (PDF, PNG or JPEG)
    input: Option<PathBuf>,
    /// Customer whose memory and list are used
    #[arg(short, long)]
    customer: Option<String>,
    /// JSON list file to use for this run instead of the stored list
    #[arg(short, long)]
    list: Option<PathBuf>,
    /// Override the LLM model id
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show confirmed mappings
    Mappings {
        #[arg(short, long)]
        customer: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the confirmed mapping for an invoice item text
    Forget {
        text: String,
        #[arg(short, long)]
        customer: Option<String>,
    },
    /// Manage a customer's candidate list
    List {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Check configuration, stored files and provider keys
    Doctor,
}

#[derive(Subcommand)]
enum ListAction {
    /// Replace the list with a JSON array of strings
    Set {
        file: PathBuf,
        #[arg(short, long)]
        customer: Option<String>,
    },
    /// Print the list used for suggestions
    Show {
        #[arg(short, long)]
        customer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MapperConfig::load()?;

    // The server logs at the configured level. Interactive commands stay
    // quiet unless a level was set explicitly, so logs don't interleave
    // with prompts. Logs go to stderr either way.
    let serving = matches!(cli.command, Some(Command::Serve { .. }));
    let level = if serving || std::env::var_os("INVOICE_MAPPER_LOG_LEVEL").is_some() {
        config.server.log_level.as_str()
    } else {
        "warn"
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.command {
        Some(command) => command,
        None => {
            let Some(input) = cli.map.input else {
                Cli::command().print_help()?;
                return Ok(());
            };
            let args = cli::map::MapArgs {
                input,
                customer: cli.map.customer,
                list: cli.map.list,
                model: cli.map.model,
            };
            return cli::map::run(config, args).await;
        }
    };

    match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await?;
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Mappings { customer, json } => {
            let mapper = InvoiceMapper::from_config(&config)?;
            let customer = mapper.resolve_customer(customer.as_deref())?;
            cli::mappings::show(&mapper, &customer, json).await?;
        }
        Command::Forget { text, customer } => {
            let mapper = InvoiceMapper::from_config(&config)?;
            let customer = mapper.resolve_customer(customer.as_deref())?;
            cli::mappings::forget(&mapper, &customer, &text).await?;
        }
        Command::List { action } => {
            let mapper = InvoiceMapper::from_config(&config)?;
            match action {
                ListAction::Set { file, customer } => {
                    let customer = mapper.resolve_customer(customer.as_deref())?;
                    cli::list::set(&mapper, &customer, &file).await?;
                }
                ListAction::Show { customer } => {
                    let customer = mapper.resolve_customer(customer.as_deref())?;
                    cli::list::show(&mapper, &customer).await?;
                }
            }
        }
    }

    Ok(())
}
