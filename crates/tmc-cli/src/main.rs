use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tmc",
    about = "TMC — multi-cluster workload placement",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a placement decision over a set of clusters.
    Decide {
        /// JSON file holding an array of clusters
        #[arg(short, long)]
        clusters: String,
        /// JSON file holding the placement policy
        #[arg(short, long)]
        policy: String,
        /// Engine configuration (default weights and strategy)
        #[arg(long)]
        config: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Check a placement policy for configuration errors.
    Validate {
        /// JSON file holding the placement policy
        #[arg(short, long)]
        policy: String,
    },
    /// Write a tmc.toml with the built-in defaults.
    Init {
        #[arg(short, long, default_value = "tmc.toml")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tmc=info".parse()?)
                .add_directive("tmc_placement=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decide {
            clusters,
            policy,
            config,
            format,
        } => commands::decide::decide(&clusters, &policy, config.as_deref(), &format),
        Commands::Validate { policy } => commands::validate::validate(&policy),
        Commands::Init { output } => commands::validate::init(&output),
    }
}
