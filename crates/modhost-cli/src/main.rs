use clap::{Parser, Subcommand};
use modhost::{
    commands::{
        call,
        config::{self, ConfigAction},
        modules,
    },
    init_tracing, GlobalOpts,
};
use modhost_logger as logger;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "modhost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Native module host",
    long_about = "modhost discovers, installs, loads and calls native modules."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure modhost
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List cataloged modules
    List {
        /// Load every module and show only those that loaded
        #[arg(long)]
        loaded: bool,
    },
    /// Show discovery directories and what they contain
    Scan,
    /// Show the descriptor, path and state of a module
    Info { name: String },
    /// Copy a module library into the managed modules directory
    Install { path: PathBuf },
    /// Load a module and list its operations
    Inspect { name: String },
    /// Load a module and invoke one of its operations
    Call {
        name: String,
        operation: String,
        /// Arguments, parsed according to the operation's parameter kinds
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
        /// Keep running posted work for this many milliseconds after the call
        #[arg(long, default_value_t = 0)]
        wait_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.global);
    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    let result = match cli.command {
        Commands::Config { action } => config::handle_config(action, &cli.global),
        Commands::List { loaded } => modules::list_modules(&cli.global, loaded),
        Commands::Scan => modules::scan_modules(&cli.global),
        Commands::Info { name } => modules::show_info(&name),
        Commands::Install { path } => modules::install_module(&path),
        Commands::Inspect { name } => call::inspect_module(&name),
        Commands::Call {
            name,
            operation,
            args,
            wait_ms,
        } => call::call_operation(&name, &operation, &args, Duration::from_millis(wait_ms)),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
