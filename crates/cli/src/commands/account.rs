//! `hw login`, `hw register`, `hw logout` and `hw profile`.

use hearthwood_storefront::api::{LoginRequest, RegisterRequest};
use hearthwood_storefront::forms::{PasswordChangeForm, ProfileForm};
use hearthwood_storefront::{Result, Storefront};
use secrecy::SecretString;

#[allow(clippy::print_stdout)]
pub async fn login(app: &Storefront, username: String, password: String) -> Result<()> {
    let request = LoginRequest {
        username,
        password: SecretString::from(password),
    };
    let response = app.api().login(&request).await?;
    let name = response.user.as_ref().map_or(request.username.as_str(), |u| u.username.as_str());
    println!("Logged in as {name}");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn register(
    app: &Storefront,
    username: String,
    password: String,
    email: String,
    full_name: String,
    phone: Option<String>,
) -> Result<()> {
    let request = RegisterRequest {
        username,
        email,
        password: SecretString::from(password),
        full_name,
        phone,
    };
    let response = app.api().register(&request).await?;
    if response.has_token() {
        println!("Account created, logged in as {}", request.username);
    } else {
        println!("Account created. Log in with `hw login`.");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn logout(app: &Storefront) -> Result<()> {
    app.api().logout()?;
    println!("Logged out");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show_profile(app: &Storefront) -> Result<()> {
    let profile = app.api().profile().await?;
    println!("Username:  {}", profile.username);
    println!("Full name: {}", profile.full_name.as_deref().unwrap_or(""));
    println!("Email:     {}", profile.email.as_deref().unwrap_or(""));
    println!("Phone:     {}", profile.phone.as_deref().unwrap_or(""));
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn update_profile(app: &Storefront, form: &ProfileForm) -> Result<()> {
    let update = form.validate()?;
    app.api().update_profile(&update).await?;
    println!("Profile updated successfully");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn change_password(app: &Storefront, form: &PasswordChangeForm) -> Result<()> {
    let request = form.validate()?;
    app.api().change_password(&request).await?;
    println!("Password changed successfully");
    Ok(())
}
