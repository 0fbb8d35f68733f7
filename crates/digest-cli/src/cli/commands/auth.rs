//! Auth command handlers.

use anyhow::Result;
use digest_core::Session;
use digest_core::api::{PasswordChange, PasswordResetConfirm, Registration};
use digest_core::credentials::mask_token;
use digest_core::models::User;

use super::{password_or_prompt, prompt_line};
use crate::cli::localized;

pub async fn login(session: &Session, username: &str, password: Option<String>) -> Result<()> {
    if let Some(user) = session.current_user() {
        println!("Already logged in as {}", user.username);
        let response = prompt_line("Log in again? [y/N] ")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Login cancelled.");
            return Ok(());
        }
    }

    let password = password_or_prompt(password, "Password: ")?;
    let creds = session
        .login(username, &password)
        .await
        .map_err(|e| localized(session, e))?;

    let name = creds
        .user
        .as_ref()
        .map_or(username, |u| u.username.as_str());
    println!("✓ Logged in as {name} (token: {})", mask_token(&creds.access));
    Ok(())
}

pub fn logout(session: &Session) -> Result<()> {
    if session.logout().map_err(|e| localized(session, e))? {
        println!("✓ Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn register(
    session: &Session,
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let (password, password2) = match password {
        Some(password) => (password.clone(), password),
        None => (
            password_or_prompt(None, "Password: ")?,
            password_or_prompt(None, "Confirm password: ")?,
        ),
    };

    let form = Registration {
        username: username.to_string(),
        email: email.to_string(),
        password,
        password2,
    };
    session
        .api()
        .register(&form)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Registered {username}. Log in with: digest login -u {username}");
    Ok(())
}

pub async fn whoami(session: &Session, refresh: bool) -> Result<()> {
    let user = if refresh && session.api().credentials().is_logged_in() {
        Some(
            session
                .api()
                .profile()
                .await
                .map_err(|e| localized(session, e))?,
        )
    } else {
        session.current_user()
    };

    match user {
        Some(user) => print_user(&user),
        None if session.api().credentials().is_logged_in() => {
            println!("Logged in (no account details stored).");
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.username, user.email);
    println!("id: {}", user.id);
    if user.is_staff {
        println!("role: admin");
    }
    if user.is_active == Some(false) {
        println!("status: locked");
    }
}

pub async fn change_password(session: &Session) -> Result<()> {
    if !session.api().credentials().is_logged_in() {
        anyhow::bail!("Not logged in. Run: digest login -u <username>");
    }

    let change = PasswordChange {
        old_password: password_or_prompt(None, "Current password: ")?,
        new_password: password_or_prompt(None, "New password: ")?,
        new_password_confirm: password_or_prompt(None, "Confirm new password: ")?,
    };
    session
        .api()
        .change_password(&change)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Password changed");
    Ok(())
}

pub async fn request_reset(session: &Session, email: &str) -> Result<()> {
    session
        .api()
        .request_password_reset(email)
        .await
        .map_err(|e| localized(session, e))?;
    println!("If {email} belongs to an account, a reset link is on its way.");
    Ok(())
}

pub async fn confirm_reset(session: &Session, token: &str) -> Result<()> {
    let confirm = PasswordResetConfirm {
        reset_token: token.to_string(),
        password: password_or_prompt(None, "New password: ")?,
        password2: password_or_prompt(None, "Confirm new password: ")?,
    };
    session
        .api()
        .confirm_password_reset(&confirm)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Password reset. Log in with the new password.");
    Ok(())
}
