// `safezone-server migrate`: create missing tables, or print the DDL that
// would run.

use clap::Args;
use colored::Colorize;

use safezone::Store;
use safezone_core::db::adapter::SchemaStatus;
use safezone_core::db::schema::Schema;
use safezone_core::options::DEFAULT_DATABASE_URL;
use safezone_sqlx::SqlxAdapter;

#[derive(Args)]
pub struct MigrateArgs {
    /// Database URL (defaults to $DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Print the pending statements without running them
    #[arg(long)]
    dry_run: bool,
}

fn database_url(args: &MigrateArgs) -> String {
    args.database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

pub async fn run(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let url = database_url(&args);
    println!("{} Database: {}", "●".cyan(), url);

    let adapter = SqlxAdapter::connect(&url).await?;

    if args.dry_run {
        let statements = adapter.pending_statements(&Schema::safezone()).await?;
        if statements.is_empty() {
            println!("{} Schema is up to date", "✔".green());
        } else {
            println!();
            for statement in &statements {
                println!("{statement};");
                println!();
            }
            println!("{} {} statement(s) pending", "●".cyan(), statements.len());
        }
        return Ok(());
    }

    let store = Store::new(std::sync::Arc::new(adapter));
    match store.ensure_schema().await? {
        SchemaStatus::UpToDate => println!("{} Schema is up to date", "✔".green()),
        SchemaStatus::NeedsMigration { statements } => {
            println!("{} Applied {} statement(s)", "✔".green(), statements.len())
        }
    }
    Ok(())
}
