//! Account commands - register, login, logout, whoami, Google sign-in

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Password};
use roadside_core::ports::GoogleLoginOptions;
use roadside_core::{LogEvent, OperationResult, User};

use super::{boot, get_context, get_logger, log_event, spinner};
use crate::output;

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(e) => Ok(e),
        None => Ok(Input::new().with_prompt("Email").interact_text()?),
    }
}

fn prompt_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("ROADSIDE_PASSWORD") {
        return Ok(p);
    }
    if atty::isnt(atty::Stream::Stdin) {
        return read_stdin_line("password");
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

/// First line of piped stdin, trimmed
fn read_stdin_line(what: &str) -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {} from stdin", what))?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("No {} provided on stdin", what);
    }
    Ok(line)
}

fn print_user(user: &User) {
    println!("  Email: {}", user.email);
    println!("  Role: {}", user.role);
    let approved = if user.approved {
        "yes".green()
    } else {
        "pending".yellow()
    };
    println!("  Approved: {}", approved);
}

pub async fn register(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let email = prompt_email(email)?;
    let password = prompt_password(password, !json)?;

    let result = ctx.access.register(&email, &password).await;
    let mut event = LogEvent::new("register").with_mode(ctx.access.mode());
    if let Err(e) = &result {
        event = event.with_error(e.kind());
    }
    log_event(&logger, event);

    if json {
        return output::print_json(&OperationResult::from(result));
    }
    let user = result?;
    output::success("Account created");
    print_user(&user);
    Ok(())
}

pub async fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let email = prompt_email(email)?;
    let password = prompt_password(password, false)?;

    let bar = spinner("Signing in...");
    let result = ctx.access.login(&email, &password).await;
    bar.finish_and_clear();

    let mut event = LogEvent::new("login").with_mode(ctx.access.mode());
    if let Err(e) = &result {
        event = event.with_error(e.kind());
    }
    log_event(&logger, event);

    if json {
        return output::print_json(&OperationResult::from(result));
    }
    let user = result?;
    output::success("Signed in");
    print_user(&user);
    Ok(())
}

pub async fn login_google(redirect_to: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx
        .access
        .login_with_google(GoogleLoginOptions { redirect_to })
        .await;

    if json {
        return output::print_json(&OperationResult::from(result));
    }
    let redirect = result?;
    println!("Open this URL in your browser to continue:");
    println!("  {}", redirect.url.underline());
    println!();
    println!(
        "Then run {} with the address you were sent back to.",
        "roadside oauth-callback <url>".bold()
    );
    Ok(())
}

pub async fn oauth_callback(url: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let url = match url {
        Some(u) => u,
        None if atty::isnt(atty::Stream::Stdin) => read_stdin_line("callback URL")?,
        None => Input::new().with_prompt("Callback URL").interact_text()?,
    };

    let bar = spinner("Completing sign-in...");
    let result = ctx.access.complete_oauth_redirect(&url).await;
    bar.finish_and_clear();

    let mut event = LogEvent::new("login")
        .with_mode(ctx.access.mode())
        .with_command("oauth-callback");
    if let Err(e) = &result {
        event = event.with_error(e.kind());
    }
    log_event(&logger, event);

    if json {
        return output::print_json(&OperationResult::from(result));
    }
    let user = result?;
    output::success("Signed in with Google");
    print_user(&user);
    Ok(())
}

pub async fn logout(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let result = ctx.access.logout().await;
    log_event(&logger, LogEvent::new("logout").with_mode(ctx.access.mode()));

    if json {
        return output::print_json(&OperationResult::from(result));
    }
    result?;
    output::success("Signed out");
    Ok(())
}

pub async fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let state = boot(&ctx).await;

    if json {
        return output::print_json(&state);
    }
    match &state.user {
        Some(user) => print_user(user),
        None => println!("Not signed in. Run {} to sign in.", "roadside login".bold()),
    }
    Ok(())
}
