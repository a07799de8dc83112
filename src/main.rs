use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hbase_tools::client::Scan;
use hbase_tools::tools::{connection, data, namespace, table};
use hbase_tools::Config;

#[derive(Parser)]
#[command(name = "hbase-tools")]
#[command(about = "Namespace, table and row helpers for HBase over the REST gateway", long_about = None)]
struct Cli {
    /// Gateway URL (overrides HBASE_REST_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cluster version
    Version,
    /// Namespace operations
    Namespace {
        #[command(subcommand)]
        command: NamespaceCommands,
    },
    /// Table operations
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },
    /// Write one cell
    Put {
        namespace: String,
        table: String,
        row: String,
        family: String,
        qualifier: String,
        value: String,
    },
    /// Print every cell of a row
    Get {
        namespace: String,
        table: String,
        row: String,
    },
    /// Print the rows of a table
    Scan {
        namespace: String,
        table: String,
        /// First row (inclusive)
        #[arg(long)]
        start: Option<String>,
        /// Last row (exclusive)
        #[arg(long)]
        stop: Option<String>,
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete a row
    Delete {
        namespace: String,
        table: String,
        row: String,
    },
}

#[derive(Subcommand)]
enum NamespaceCommands {
    /// List namespaces
    List,
    /// Check whether a namespace exists
    Exists { namespace: String },
    /// Create a namespace
    Create { namespace: String },
    /// Delete an empty namespace
    Delete { namespace: String },
}

#[derive(Subcommand)]
enum TableCommands {
    /// List the tables of a namespace
    List { namespace: String },
    /// Check whether a table exists
    Exists { namespace: String, table: String },
    /// Create a table with one or more column families
    Create {
        namespace: String,
        table: String,
        #[arg(required = true)]
        families: Vec<String>,
    },
    /// Disable and drop a table
    Delete { namespace: String, table: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.url {
        config.rest_url = url;
    }
    let conn = connection::get_conn_with(config).context("Failed to create connection")?;

    match cli.command {
        Commands::Version => {
            let version = conn.cluster_version().await.context("Failed to reach the gateway")?;
            println!("{}", version);
        }

        Commands::Namespace { command } => match command {
            NamespaceCommands::List => {
                for name in namespace::list_namespaces(&conn).await.context("Failed to list namespaces")? {
                    println!("{}", name);
                }
            }
            NamespaceCommands::Exists { namespace: ns } => {
                println!("{}", namespace::namespace_exists(&conn, &ns).await);
            }
            NamespaceCommands::Create { namespace: ns } => {
                if !namespace::create_namespace(&conn, &ns).await {
                    bail!("Namespace '{}' was not created", ns);
                }
                println!("Namespace created: {}", ns);
            }
            NamespaceCommands::Delete { namespace: ns } => {
                if !namespace::delete_namespace(&conn, &ns).await {
                    bail!("Namespace '{}' was not deleted", ns);
                }
                println!("Namespace deleted: {}", ns);
            }
        },

        Commands::Table { command } => match command {
            TableCommands::List { namespace: ns } => {
                let tables = table::list_tables(&conn, &ns).await.context("Failed to list tables")?;
                for name in tables.unwrap_or_default() {
                    println!("{}", name);
                }
            }
            TableCommands::Exists { namespace: ns, table: t } => {
                let exists = table::table_exists(&conn, &ns, &t).await.context("Failed to check table")?;
                println!("{}", exists);
            }
            TableCommands::Create { namespace: ns, table: t, families } => {
                let families: Vec<&str> = families.iter().map(String::as_str).collect();
                if !table::create_table(&conn, &ns, &t, &families).await.context("Failed to create table")? {
                    bail!("Table '{}:{}' was not created", ns, t);
                }
                println!("Table created: {}:{}", ns, t);
            }
            TableCommands::Delete { namespace: ns, table: t } => {
                if !table::delete_table(&conn, &ns, &t).await.context("Failed to delete table")? {
                    bail!("Table '{}:{}' was not deleted", ns, t);
                }
                println!("Table deleted: {}:{}", ns, t);
            }
        },

        Commands::Put { namespace: ns, table: t, row, family, qualifier, value } => {
            data::put(&conn, &ns, &t, &row, &family, &qualifier, &value)
                .await
                .context("Failed to put cell")?;
            println!("Cell stored");
        }

        Commands::Get { namespace: ns, table: t, row } => {
            match data::get(&conn, &ns, &t, &row).await.context("Failed to get row")? {
                Some(result) => print!("{}", data::parse_result(&result)),
                None => println!("Row not found"),
            }
        }

        Commands::Scan { namespace: ns, table: t, start, stop, limit } => {
            let mut scan = Scan::new();
            if let Some(start) = start {
                scan = scan.with_start_row(start);
            }
            if let Some(stop) = stop {
                scan = scan.with_stop_row(stop);
            }
            if let Some(limit) = limit {
                scan = scan.with_limit(limit);
            }
            let rows = data::scan_with(&conn, &ns, &t, scan).await.context("Failed to scan table")?;
            for row in &rows {
                print!("{}", data::parse_result(row));
            }
            info!("{} rows", rows.len());
        }

        Commands::Delete { namespace: ns, table: t, row } => {
            data::delete(&conn, &ns, &t, &row).await.context("Failed to delete row")?;
            println!("Row deleted");
        }
    }

    connection::close(Some(conn));
    Ok(())
}
