//! Create a portal account directly in the database.
//! Used to seed the first administrator before anyone can log in.
//!
//! Usage: create-user --email E --name N --role ADMIN|ACCOUNTANT [--password P]
//!   --password P : Optional; a random password is generated and printed when omitted

use clap::Parser;
use rand::Rng;

use bizdesk_api::{
    config::validate_bcrypt_cost,
    db,
    models::user::{CreateUserRequest, UserRole},
    services::users::UserService,
};

#[derive(Parser)]
#[command(name = "create-user", about = "Create a bizdesk portal account")]
struct Args {
    #[arg(long)]
    email: String,

    #[arg(long)]
    name: String,

    /// ADMIN or ACCOUNTANT
    #[arg(long, value_parser = parse_role)]
    role: UserRole,

    #[arg(long)]
    password: Option<String>,

    /// bcrypt cost (falls back to BCRYPT_COST, then 12)
    #[arg(long)]
    cost: Option<u32>,
}

fn parse_role(s: &str) -> Result<UserRole, String> {
    s.to_uppercase().parse().map_err(|e: anyhow::Error| e.to_string())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let cost = match args.cost {
        Some(c) => c,
        None => std::env::var("BCRYPT_COST")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()?
            .unwrap_or(12),
    };
    let cost = validate_bcrypt_cost(cost)?;

    let pool = db::create_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let generated = args.password.is_none();
    let password = args.password.unwrap_or_else(generate_password);

    let profile = UserService::create(
        &pool,
        CreateUserRequest {
            email: args.email,
            name: args.name,
            password: password.clone(),
            role: args.role,
        },
        cost,
    )
    .await
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    tracing::info!("Created {} account {} ({})", profile.role, profile.email, profile.id);
    if generated {
        println!("Generated password for {}: {}", profile.email, password);
    }

    Ok(())
}
