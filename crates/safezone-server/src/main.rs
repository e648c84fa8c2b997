use clap::{Parser, Subcommand};

mod commands;

/// SafeZonePH community backend server
#[derive(Parser)]
#[command(name = "safezone-server", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve(commands::serve::ServeArgs),

    /// Create the database tables, or print the DDL with --dry-run
    Migrate(commands::migrate::MigrateArgs),

    /// Generate a random secret for JWT_SECRET_KEY
    Secret,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Migrate(args) => commands::migrate::run(args).await,
        Commands::Secret => commands::secret::run(),
    };

    if let Err(e) = result {
        eprintln!("{} {}", colored::Colorize::red("error:"), e);
        std::process::exit(1);
    }
}
