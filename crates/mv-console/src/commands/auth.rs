//! Session commands.

use std::io::{BufRead, Write};

use clap::Args;

use mv_protocol::rest::RegisterRequest;

use crate::Ctx;

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Password; prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: Option<String>,
}

fn prompt_password() -> anyhow::Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

pub async fn login(ctx: &Ctx, args: LoginArgs) -> anyhow::Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let user = ctx.api.login(&args.email, &password).await?;
    println!("Logged in as {} ({:?})", user.email, user.role);
    Ok(())
}

pub async fn register(ctx: &Ctx, args: RegisterArgs) -> anyhow::Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let request = RegisterRequest {
        email: args.email,
        username: args.username,
        password: password.clone(),
        confirm_password: password,
    };
    let user = ctx.api.register(&request).await?;
    println!("Account created for {}", user.email);
    Ok(())
}

pub async fn logout(ctx: &Ctx) -> anyhow::Result<()> {
    ctx.api.logout().await?;
    println!("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &Ctx) -> anyhow::Result<()> {
    if !ctx.tokens.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }
    let user = ctx.api.current_user().await?;
    println!("{} ({:?}, active: {})", user.email, user.role, user.is_active);
    Ok(())
}
