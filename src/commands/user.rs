//! Account commands: register, login, email and 2FA binding, passwords.

use crate::api::{MeData, ResetTicket, TokenData, TwoFaTicket};
use crate::codes::ErrorCode;
use crate::error::CliError;
use crate::session::Session;
use crate::validate::{check_email, check_username, PasswordReport};
use anyhow::Result;
use std::io::Write;

const BAD_EMAIL: &str = "Your email does not seem correct, please check and try again.";

/// Prints the policy checklist and fails when `password` is too weak.
fn enforce_policy<W: Write>(s: &mut Session<W>, password: &str) -> Result<()> {
    let report = PasswordReport::of(password);
    if report.is_acceptable() {
        return Ok(());
    }
    s.out
        .warn("Your password must meet the length rule and at least two of the other conditions:")?;
    for line in report.checklist() {
        s.out.line(line)?;
    }
    Err(CliError::invalid(ErrorCode::InvalidPassword.message()).into())
}

/// Asks for a new password twice and checks policy and match.
fn new_password<W: Write>(s: &mut Session<W>, prompt: &str) -> Result<String> {
    let password = s.prompt.password(prompt)?;
    enforce_policy(s, &password)?;
    let confirm = s.prompt.password("Please confirm password")?;
    if password != confirm {
        return Err(CliError::invalid("Passwords don't match.").into());
    }
    Ok(password)
}

pub fn register<W: Write>(s: &mut Session<W>, username: &str, email: Option<&str>) -> Result<()> {
    if !check_username(username) {
        return Err(CliError::invalid(ErrorCode::InvalidUsername.message()).into());
    }
    if email.is_some_and(|e| !check_email(e)) {
        return Err(CliError::invalid(BAD_EMAIL).into());
    }
    let password = new_password(s, "Please input password")?;

    let registered = s.api.register(username, &password)?;
    s.check(registered)?;
    s.out.success("Register successful! Logging you in now.")?;
    login_with(s, username, &password)?;

    if let Some(email) = email {
        bind_email(s, email)?;
    }
    Ok(())
}

pub fn login<W: Write>(s: &mut Session<W>, username: &str) -> Result<()> {
    let password = s.prompt.password("Please input password")?;
    login_with(s, username, &password)
}

/// Logs in and saves the returned token. The config is left alone when the
/// server refuses.
pub fn login_with<W: Write>(s: &mut Session<W>, username: &str, password: &str) -> Result<()> {
    let envelope = s.api.login(username, password)?;
    let envelope = s.check(envelope)?;
    let TokenData { token } = envelope.data_as::<TokenData>()?;
    s.store_token(Some(token))?;
    s.out.success("Login successful! Your token is saved.")?;
    Ok(())
}

pub fn logout<W: Write>(s: &mut Session<W>) -> Result<()> {
    s.store_token(None)?;
    s.out.success("Logout successful!")?;
    Ok(())
}

pub fn bind_email<W: Write>(s: &mut Session<W>, email: &str) -> Result<()> {
    s.require_login()?;
    if !check_email(email) {
        return Err(CliError::invalid(BAD_EMAIL).into());
    }
    let envelope = s.api.bind_email(email)?;
    s.check(envelope)?;
    s.out.success(format!(
        "Your email `{email}` will receive a verification link, please check your inbox."
    ))?;
    Ok(())
}

pub fn me<W: Write>(s: &mut Session<W>) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.me()?;
    let me: MeData = s.check(envelope)?.data_as()?;
    let email = me
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "Not bound".to_string());
    let two_fa = if me.has_2fa { "Bound" } else { "Not bound" };
    s.out.fields(&[
        ("ID", display_value(&me.id)),
        ("Username", me.username),
        ("Email", email),
        ("2FA", two_fa.to_string()),
    ])?;
    Ok(())
}

/// Secret parameter of an `otpauth://` URI.
pub fn otpauth_secret(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("secret=")?;
    let secret = rest.split('&').next().unwrap_or_default();
    (!secret.is_empty()).then_some(secret)
}

pub fn two_fa<W: Write>(s: &mut Session<W>) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.two_fa_request()?;
    let TwoFaTicket { ticket, otpauth } = s.check(envelope)?.data_as::<TwoFaTicket>()?;

    s.out.line("Scan this QR code with your 2FA app:")?;
    if !s.out.qr_code(&otpauth)? {
        s.out.line(&otpauth)?;
    }
    if let Some(secret) = otpauth_secret(&otpauth) {
        s.out.line(format!(
            "If you cannot scan the QR code, enter the secret in your 2FA app by hand: `{secret}`"
        ))?;
    }
    let code = s.prompt.input("Please input the code from your 2FA app")?;

    let envelope = s.api.two_fa_bind(&ticket, code.trim())?;
    s.check(envelope)?;
    s.out.success("2FA bind successful!")?;
    Ok(())
}

pub fn change_password<W: Write>(s: &mut Session<W>) -> Result<()> {
    s.require_login()?;
    let old = s.prompt.password("Please input old password")?;
    let new = s.prompt.password("Please input new password")?;
    if old == new {
        return Err(CliError::invalid("New password cannot be the same as old password.").into());
    }
    enforce_policy(s, &new)?;
    let confirm = s.prompt.password("Please confirm new password")?;
    if new != confirm {
        return Err(CliError::invalid("Passwords don't match.").into());
    }

    let envelope = s.api.change_password(&old, &new)?;
    s.check(envelope)?;
    s.store_token(None)?;
    s.out
        .success("Password changed! You have been logged out, please log in again.")?;
    Ok(())
}

/// Requests a reset ticket by email, then continues with [`reset_password`].
pub fn forget_password<W: Write>(s: &mut Session<W>, username: &str, email: &str) -> Result<()> {
    if !check_email(email) {
        return Err(CliError::invalid(BAD_EMAIL).into());
    }
    let envelope = s.api.forget_password(username, email)?;
    let ResetTicket { ticket } = s.check(envelope)?.data_as::<ResetTicket>()?;
    s.out
        .line(format!("Please check your email `{email}` for the code."))?;
    reset_password(s, &ticket)
}

/// Finishes a password reset for an existing ticket.
pub fn reset_password<W: Write>(s: &mut Session<W>, ticket: &str) -> Result<()> {
    let code = s.prompt.input("Please input the code from your email")?;
    let code: i64 = code
        .trim()
        .parse()
        .map_err(|_| CliError::invalid("The code from the email should be a number."))?;
    let password = new_password(s, "Please input new password")?;

    let envelope = s.api.reset_password(ticket, code, &password)?;
    s.check(envelope)?;
    s.out
        .success("Password reset successful! You can log in with your new password.")?;
    Ok(())
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_extracted() {
        let uri = "otpauth://totp/Funix:alice?secret=JBSWY3DP&issuer=Funix";
        assert_eq!(otpauth_secret(uri), Some("JBSWY3DP"));
        assert_eq!(otpauth_secret("otpauth://totp/x?secret=ABC"), Some("ABC"));
        assert_eq!(otpauth_secret("otpauth://totp/x?issuer=Funix"), None);
        assert_eq!(otpauth_secret("otpauth://totp/x?secret=&a=b"), None);
    }
}
