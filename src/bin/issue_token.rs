use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use astar_api::services::auth::issue_token;

/// Mint a self-issued HS256 access token.
///
/// Administrative utility, not an HTTP endpoint: whoever holds the shared secret can
/// mint tokens for any subject.
/// - Claims: uid, role, iat (now), exp (now + ttl)
/// - Output: the compact JWT on stdout
#[derive(Parser, Debug)]
#[command(name = "issue-token", version, about)]
struct Args {
    /// Shared HS256 secret (defaults to JWT_SECRET from the environment / .env)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    secret: String,

    /// Subject identifier written to the `uid` claim
    #[arg(long)]
    uid: String,

    /// Flat role string written to the `role` claim
    #[arg(long, default_value = "")]
    role: String,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    ttl_seconds: u64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let token = issue_token(
        &args.secret,
        &args.uid,
        &args.role,
        Duration::from_secs(args.ttl_seconds),
    )
    .context("failed to issue token")?;

    println!("{token}");
    Ok(())
}
