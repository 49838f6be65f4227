//! Creates a user account directly in the database.
//!
//! ```text
//! seed-user --email admin@example.com
//! ```
//!
//! Missing email or password are read from stdin.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use payflow::adapters::{Argon2PasswordHasher, PostgresUserRepository};
use payflow::application::handlers::{RegisterUserCommand, RegisterUserHandler};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Create a Payflow user account", long_about = None)]
struct Opts {
    /// PostgreSQL connection URL
    #[arg(long = "database-url", env = "PAYFLOW__DATABASE__URL")]
    database_url: String,

    /// Account email (prompted when omitted)
    #[arg(long, short = 'e')]
    email: Option<String>,

    /// Account password (prompted when omitted)
    #[arg(long, short = 'p', env = "PAYFLOW_SEED_PASSWORD")]
    password: Option<String>,

    /// Minimum accepted password length
    #[arg(
        long = "min-password-length",
        env = "PAYFLOW__AUTH__MIN_PASSWORD_LENGTH",
        default_value_t = 8
    )]
    min_password_length: usize,
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let opts = Opts::parse();
    let email = match opts.email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = match opts.password {
        Some(password) => password,
        None => prompt("Password")?,
    };
    if email.is_empty() || password.is_empty() {
        bail!("Email and password are required");
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&opts.database_url)
        .await
        .context("Failed to connect to database")?;

    let handler = RegisterUserHandler::new(
        Arc::new(PostgresUserRepository::new(pool)),
        Arc::new(Argon2PasswordHasher::new()),
        opts.min_password_length,
    );
    let user = handler
        .handle(RegisterUserCommand { email, password })
        .await
        .context("Failed to create user")?;

    println!("User created: id={}, email={}", user.id, user.email);
    Ok(())
}
