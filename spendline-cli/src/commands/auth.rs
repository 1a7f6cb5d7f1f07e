//! Signup, login and logout

use std::env;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};
use spendline_core::{LoginForm, Route, SignupForm};

use super::{cancel_on_interrupt, finish, get_context, runtime};
use crate::output;
use spendline_core::services::LoggingService;

/// Use the flag, then SPENDLINE_PASSWORD, then prompt
fn password_or_prompt(flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Ok(p) = env::var("SPENDLINE_PASSWORD") {
        return Ok(p);
    }
    Ok(Password::new().with_prompt(prompt).interact()?)
}

fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
    }
}

pub fn run_signup(
    logger: Option<Arc<LoggingService>>,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context(logger)?;
    if ctx.route(Route::Signup)? == Route::Dashboard {
        output::warning("Already logged in. Run `sl logout` to create another account.");
        return Ok(());
    }

    let name = value_or_prompt(name, "Name")?;
    let email = value_or_prompt(email, "Email")?;
    let (password, confirm_password) = match password {
        Some(p) => (p.clone(), p),
        None => match env::var("SPENDLINE_PASSWORD") {
            Ok(p) => (p.clone(), p),
            Err(_) => (
                password_or_prompt(None, "Password")?,
                password_or_prompt(None, "Confirm password")?,
            ),
        },
    };
    let form = SignupForm {
        name,
        email,
        password,
        confirm_password,
    };

    let rt = runtime()?;
    let cancel = cancel_on_interrupt(&rt);
    let pb = (!json).then(|| output::spinner("Creating account..."));
    let result = rt.block_on(ctx.signup(&form, &cancel));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    finish(result, json, |profile| {
        output::success("Account created");
        println!("Welcome, {}! Log in with `sl login {}`.", profile.name, profile.email);
    })
}

pub fn run_login(
    logger: Option<Arc<LoggingService>>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context(logger)?;
    let email = value_or_prompt(email, "Email")?;
    let password = password_or_prompt(password, "Password")?;
    let form = LoginForm::new(email, password);

    let rt = runtime()?;
    let cancel = cancel_on_interrupt(&rt);
    let pb = (!json).then(|| output::spinner("Logging in..."));
    let result = rt.block_on(ctx.login(&form, &cancel));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let pending = ctx.sync_service.pending()?.len();
    finish(result, json, |session| {
        output::success(&format!("Welcome back, {}", session.user.name));
        if pending > 0 {
            output::info(&format!(
                "{} offline change(s) waiting. Run `sl sync` to replay them.",
                pending
            ));
        }
    })
}

pub fn run_logout(logger: Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;
    let was_logged_in = ctx.restore_session()?.is_some();
    let result = ctx.logout().map(|_| was_logged_in);

    finish(result, json, |was_logged_in| {
        if was_logged_in {
            println!("{}", "Logged out".green());
        } else {
            println!("Not logged in.");
        }
    })
}
