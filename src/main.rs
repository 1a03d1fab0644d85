use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rainsafe::auth::RegisterRequest;
use rainsafe::cli::{self, commands::Context, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rainsafe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return cli::commands::init().await;
    }

    let config = cli::commands::load_config(cli.api_url)?;
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Register {
            email,
            first_name,
            last_name,
            age,
            contact_number,
            sex,
            purok,
            barangay,
            municipal,
            province,
        } => {
            let form = RegisterRequest {
                email,
                first_name,
                last_name,
                age,
                contact_number,
                sex,
                purok,
                barangay,
                municipal,
                province,
                ..Default::default()
            };
            cli::commands::register(&ctx, form).await
        }
        Commands::Login { email } => cli::commands::login(&ctx, email).await,
        Commands::Logout => cli::commands::logout(&ctx).await,
        Commands::Status { format } => cli::commands::status(&ctx, format).await,
        Commands::Renew => cli::commands::renew(&ctx).await,
        Commands::Authorize { role } => cli::commands::authorize(&ctx, role).await,
        Commands::Notifications { action } => cli::commands::notifications(&ctx, action).await,
    }
}
