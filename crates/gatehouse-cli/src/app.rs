//! Application state and command handlers.
//!
//! `App` mounts the `SessionProvider` once and hands its `SessionContext` to
//! every screen. Screens never touch storage or the manager directly.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use gatehouse_core::api::{IdentityClient, ProfileForm, SignupForm};
use gatehouse_core::{use_session, AuthView, Config, Credential, SessionContext, SessionProvider};

#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    /// Nickname shown in the navigation bar
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    /// Digits and hyphens only
    #[arg(long)]
    pub phone: Option<String>,
    /// Numeric country code
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub address1: Option<String>,
    #[arg(long)]
    pub address2: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub birth: Option<String>,
    /// URL of an already uploaded profile image
    #[arg(long)]
    pub profile_image: Option<String>,
    /// URL of an already uploaded background image
    #[arg(long)]
    pub bg_image: Option<String>,
}

pub struct App {
    config: Config,
    provider: SessionProvider,
    api: IdentityClient,
}

impl App {
    pub fn new(config: Config, api_url: Option<String>) -> Result<Self> {
        let store = config.open_store().context("Failed to open session storage")?;
        let provider = SessionProvider::mount(store);
        if provider.is_memory_only() {
            warn!("Session storage unavailable, this session will not be remembered");
        }

        let base_url = api_url.unwrap_or_else(|| config.api_base_url());
        let api = IdentityClient::new(&base_url)?;

        Ok(Self {
            config,
            provider,
            api,
        })
    }

    fn context(&self) -> SessionContext {
        self.provider.context()
    }

    pub fn status(&self, json: bool) -> Result<()> {
        let ctx = self.context();
        if json {
            let snapshot = use_session(&ctx).snapshot();
            let body = serde_json::json!({
                "view": snapshot.view(),
                "user": snapshot.user(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            println!("{}", nav_bar(&ctx));
        }
        Ok(())
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        if email.is_empty() || password.is_empty() {
            bail!("Email and password required");
        }

        let payload = self.api.login(&email, &password).await?;
        use_session(&self.context()).login(payload.user, payload.token);

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        info!("Login successful");
        println!("{}", nav_bar(&self.context()));
        Ok(())
    }

    pub fn logout(&self, yes: bool) -> Result<()> {
        let session = use_session(&self.context());
        if !session.is_authenticated() {
            println!("Not logged in");
            return Ok(());
        }

        if !yes && !confirm("Log out? [y/N] ")? {
            return Ok(());
        }

        session.logout();
        println!("Logged out");
        Ok(())
    }

    pub async fn signup(&self, email: String, username: String) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm_password = rpassword::prompt_password("Confirm password: ")?;

        let form = SignupForm {
            email,
            password,
            confirm_password,
            username,
        };
        let request = form.validate()?;

        let message = self.api.signup(&request).await?;
        println!("{}", if message.is_empty() { "Account created" } else { message.as_str() });
        Ok(())
    }

    pub async fn update_profile(&self, args: ProfileArgs) -> Result<()> {
        let session = use_session(&self.context());
        let (Some(user), Some(credential)) = (session.user(), session.credential()) else {
            bail!("Not logged in. Run `gatehouse login` first.");
        };

        let update = profile_form(ProfileForm::for_user(&user), args).validate()?;
        let message = self
            .api
            .with_token(credential)
            .update_profile(&update)
            .await?;

        println!("{}", if message.is_empty() { "Profile updated" } else { message.as_str() });
        Ok(())
    }

    pub fn set_token(&self, token: String) -> Result<()> {
        let credential = Credential::new(token)?;
        use_session(&self.context()).update_credential(credential)?;
        println!("Access token updated");
        Ok(())
    }
}

/// Navigation bar text for the current session.
fn nav_bar(ctx: &SessionContext) -> String {
    match use_session(ctx).snapshot().view() {
        AuthView::Pending => String::new(),
        AuthView::Anonymous => "Not logged in (gatehouse login | gatehouse signup)".to_string(),
        AuthView::SignedIn { name: Some(name) } => format!("Logged in as {}", name),
        AuthView::SignedIn { name: None } => "Logged in".to_string(),
    }
}

/// Overlay command line values on a prefilled profile form.
fn profile_form(mut form: ProfileForm, args: ProfileArgs) -> ProfileForm {
    let ProfileArgs {
        name,
        last_name,
        first_name,
        phone,
        country,
        address1,
        address2,
        birth,
        profile_image,
        bg_image,
    } = args;

    if let Some(v) = name {
        form.name = v;
    }
    if let Some(v) = last_name {
        form.last_name = v;
    }
    if let Some(v) = first_name {
        form.first_name = v;
    }
    if let Some(v) = phone {
        form.phone_number = v;
    }
    if let Some(v) = country {
        form.country = v;
    }
    if let Some(v) = address1 {
        form.address1 = v;
    }
    if let Some(v) = address2 {
        form.address2 = v;
    }
    if let Some(v) = birth {
        form.birth = v;
    }
    form.profile_image = profile_image;
    form.bg_image = bg_image;
    form
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(label: &str) -> Result<bool> {
    let answer = prompt(label)?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}
