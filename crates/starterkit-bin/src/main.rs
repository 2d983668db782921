// ============================
// crates/starterkit-bin/src/main.rs
// ============================
//! Command line entry point: form checks and an in-memory auth walkthrough.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use starterkit_common::ProfileUpdate;
use starterkit_lib::{
    auth::{AuthStateReader, SessionStatus},
    config::Settings,
    validation::{self, FieldErrors},
    AppState,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "starterkit", version, about = "Starter kit auth and form tools")]
struct Cli {
    /// TOML settings file; defaults to starterkit.{toml,json,yaml}
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rate a password as weak, medium or strong
    Strength { password: String },
    /// Validate a JSON form payload
    Validate { form: Form, json: String },
    /// Walk through sign up, confirmation, sign in, profile update and sign out
    Demo {
        #[arg(long, default_value = "demo@example.com")]
        email: String,
        #[arg(long, default_value = "Demo1234")]
        password: String,
        #[arg(long, default_value = "Demo User")]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Form {
    Login,
    Signup,
    ResetRequest,
    ResetPassword,
    ChangePassword,
    ChangeEmail,
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Using default settings: {e}");
            Settings::default()
        }),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Strength { password } => {
            println!("{}", validation::password_strength(&password));
            Ok(())
        },
        Command::Validate { form, json } => validate(form, &json),
        Command::Demo {
            email,
            password,
            name,
        } => demo(settings, &email, &password, &name).await,
    }
}

fn validate(form: Form, json: &str) -> Result<()> {
    let result = match form {
        Form::Login => validation::validate_login(&parse(json)?).map(drop),
        Form::Signup => validation::validate_signup(&parse(json)?).map(drop),
        Form::ResetRequest => validation::validate_reset_request(&parse(json)?).map(drop),
        Form::ResetPassword => validation::validate_reset_password(&parse(json)?).map(drop),
        Form::ChangePassword => validation::validate_change_password(&parse(json)?).map(drop),
        Form::ChangeEmail => validation::validate_change_email(&parse(json)?).map(drop),
        Form::Profile => validation::validate_profile(&parse(json)?).map(drop),
    };
    report(result)
}

fn parse<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).context("form payload is not valid JSON for this form")
}

fn report(result: Result<(), FieldErrors>) -> Result<()> {
    match result {
        Ok(()) => {
            println!("valid");
            Ok(())
        },
        Err(errors) => {
            println!("{}", serde_json::to_string_pretty(&errors)?);
            bail!("{} field(s) failed validation", errors.len())
        },
    }
}

async fn demo(settings: Settings, email: &str, password: &str, name: &str) -> Result<()> {
    let signup = validation::validate_signup(&validation::SignupInput {
        full_name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
        accept_terms: true,
    })
    .map_err(|e| anyhow::anyhow!("demo credentials rejected: {e}"))?;

    let (state, provider) = AppState::with_memory_provider(settings);
    let auth = state.auth.clone();
    auth.initialize().await;
    let _subscription = auth.start();
    let mut changes = state.auth_reader().watch();

    let outcome = auth
        .sign_up(&signup.email, &signup.password, &signup.full_name)
        .await?;
    info!(needs_verification = outcome.needs_verification, "Signed up");

    if outcome.needs_verification {
        for message in provider.outbox().await {
            info!(to = %message.email, kind = ?message.kind, "Email queued");
        }
        provider.confirm_email(&signup.email).await?;
    }
    tokio::time::timeout(
        Duration::from_secs(5),
        changes.wait_for(|s| s.status == SessionStatus::Active && s.profile.is_some()),
    )
    .await
    .context("session did not become active")??;
    println!("confirmed {}", signup.email);

    if let Some(e) = auth.sign_out().await {
        warn!("Sign out reported: {e}");
    }
    auth.sign_in(&signup.email, &signup.password).await?;
    println!("signed in as {}", signup.email);

    let profile = validation::validate_profile(&validation::ProfileInput {
        full_name: signup.full_name.clone(),
        bio: Some("Trying out the starter kit".to_string()),
        location: None,
        website: Some("https://example.com".to_string()),
    })
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    let updated = auth.update_profile(profile.into_update()).await?;
    println!(
        "profile: {} ({})",
        updated.full_name,
        updated.bio.as_deref().unwrap_or("no bio")
    );

    // an empty update is served from the cached profile
    let cached = auth.update_profile(ProfileUpdate::default()).await?;
    println!("theme: {:?}, website: {:?}", auth.resolved_theme(false), cached.website);

    if let Some(e) = auth.sign_out().await {
        warn!("Sign out reported: {e}");
    }
    tokio::time::timeout(
        Duration::from_secs(5),
        changes.wait_for(|s| s.status == SessionStatus::Anonymous),
    )
    .await
    .context("session was not cleared")??;
    println!("signed out, authenticated = {}", auth.is_authenticated());
    Ok(())
}
