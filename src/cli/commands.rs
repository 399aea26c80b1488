use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use crate::{
    app::{get_config_dir, init_config, AppState},
    constants::{LOAD_FAILED_MESSAGE, UPLOAD_FAILED_MESSAGE},
    http::ProgressCallback,
    models::{NewUser, User, UserPatch},
    upload::{MediaKind, UploadError, UploadFile},
    utils::{log_error, log_info, log_warn, normalize_input_path},
};

use super::{Commands, LoginArgs, UserCommands};

/// Write a default configuration file
pub fn run_init() -> Result<()> {
    println!("Initializing userdesk configuration...");
    match init_config()? {
        Some(path) => println!("  {} {}", "Created".green(), path.display()),
        None => println!("  {} configuration already exists", "Skipped".yellow()),
    }
    Ok(())
}

/// Handle CLI subcommands
pub async fn handle_command(command: &Commands, state: &AppState) -> Result<()> {
    match command {
        Commands::Init => run_init(),
        Commands::Status => {
            show_status(state);
            Ok(())
        }
        Commands::Login(args) => login(state, args),
        Commands::Logout => {
            state.session.logout().context("Failed to persist session")?;
            log_info("🔓", "session cleared");
            println!("Logged out");
            Ok(())
        }
        Commands::Profile => {
            show_profile(state);
            Ok(())
        }
        Commands::Users { action } => handle_users(state, action).await,
        Commands::Upload { paths } => upload(state, paths).await,
    }
}

fn login(state: &AppState, args: &LoginArgs) -> Result<()> {
    let user = User {
        id: args.id,
        name: args.name.clone(),
        email: args.email.clone(),
        avatar: args.avatar.clone(),
    };
    state
        .session
        .login(user, args.token.clone())
        .context("Failed to persist session")?;

    log_info("🔐", format!("session stored for user {}", args.id));
    let session = state.session.session();
    println!("Logged in as {}", session.display_name().unwrap_or(&args.name).green());
    Ok(())
}

fn show_profile(state: &AppState) {
    let session = state.session.session();
    match &session.user {
        Some(user) if session.is_authenticated => print_user(user),
        _ => println!("{}", "Not logged in".yellow()),
    }
}

fn show_status(state: &AppState) {
    println!("userdesk status:");
    println!();
    println!("  API base URL: {}", state.gateway.base_url());
    println!("  Timeout:      {}s", state.config.api.timeout_secs);

    match &state.storage_dir {
        Some(dir) => println!("  Storage:      {}", dir.display()),
        None => println!("  Storage:      in memory"),
    }

    match get_config_dir() {
        Ok(dir) => {
            let path = dir.join("config.toml");
            if path.exists() {
                println!("  [OK] Configuration: {}", path.display());
            } else {
                println!("  [WARNING] Configuration: Not found (using defaults)");
            }
        }
        Err(e) => println!("  [ERROR] Configuration: {e}"),
    }

    let session = state.session.session();
    match &session.user {
        Some(user) if session.is_authenticated => {
            println!("  [OK] Session: {} <{}>", user.name, user.email)
        }
        _ => println!("  [WARNING] Session: not logged in"),
    }
    if !session.is_consistent() {
        println!("  [WARNING] Session: user and token out of sync, log in again");
    }
}

async fn handle_users(state: &AppState, action: &UserCommands) -> Result<()> {
    match action {
        UserCommands::List => {
            let users = state.users.list().await.map_err(|e| {
                debug!(error = %e, "user list unavailable");
                anyhow::anyhow!(LOAD_FAILED_MESSAGE)
            })?;
            if users.is_empty() {
                println!("No users");
            }
            for user in users.iter() {
                print_user(user);
            }
        }
        UserCommands::Get { id } => {
            let user = state.users.get(*id).await.map_err(|e| {
                debug!(id, error = %e, "user unavailable");
                anyhow::anyhow!(LOAD_FAILED_MESSAGE)
            })?;
            print_user(&user);
        }
        UserCommands::Create {
            name,
            email,
            avatar,
        } => {
            let created = state
                .users
                .create(NewUser {
                    name: name.clone(),
                    email: email.clone(),
                    avatar: avatar.clone(),
                })
                .await
                .context("Failed to create user")?;
            println!("{}", "Created".green());
            print_user(&created);
        }
        UserCommands::Update {
            id,
            name,
            email,
            avatar,
        } => {
            let patch = UserPatch {
                name: name.clone(),
                email: email.clone(),
                avatar: avatar.clone(),
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update: pass --name, --email or --avatar");
            }
            let updated = state
                .users
                .update(*id, patch)
                .await
                .with_context(|| format!("Failed to update user {id}"))?;
            println!("{}", "Updated".green());
            print_user(&updated);
        }
        UserCommands::Delete { id } => {
            state
                .users
                .delete(*id)
                .await
                .with_context(|| format!("Failed to delete user {id}"))?;
            println!("{} user {}", "Deleted".green(), id);
        }
    }
    Ok(())
}

async fn upload(state: &AppState, paths: &[String]) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for raw in paths {
        let path = normalize_input_path(raw);
        match UploadFile::from_path(&path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                report_upload_error(&e);
                return Err(e.into());
            }
        }
    }

    let progress: ProgressCallback = Arc::new(|percent| {
        eprint!("\r  Uploading... {percent:>3}%");
        let _ = std::io::stderr().flush();
    });

    let results = state.uploader.handle_drop(files, Some(progress)).await.map_err(|e| {
        report_upload_error(&e);
        anyhow::Error::new(e)
    })?;

    let mut failed = 0;
    for result in results {
        eprintln!();
        match result {
            Ok(media) => {
                let label = match media.kind {
                    MediaKind::Video => "Video uploaded",
                    MediaKind::Image => "Image uploaded",
                };
                println!("{}: {}", label.green(), media.response.url);
                println!("{}", media.markup);
            }
            Err(e) => {
                // Validation failures were already logged by the upload path
                if matches!(e, UploadError::Gateway(_)) {
                    report_upload_error(&e);
                }
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{UPLOAD_FAILED_MESSAGE} ({failed} of {} files)", paths.len());
    }
    Ok(())
}

fn report_upload_error(e: &UploadError) {
    match e {
        UploadError::Gateway(_) => log_error("❌", format!("{UPLOAD_FAILED_MESSAGE}: {e}")),
        e if e.is_warning() => log_warn("⚠️", e),
        e => log_error("❌", e),
    }
}

fn print_user(user: &User) {
    print!("  {:>5}  {}  <{}>", user.id.to_string().cyan(), user.name.bold(), user.email);
    match &user.avatar {
        Some(avatar) => println!("  {}", avatar.dimmed()),
        None => println!(),
    }
}
