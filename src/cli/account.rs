use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;

use crate::core::config::Settings;
use crate::core::marketplace::MarketplaceClient;
use crate::core::terminal::{print_info, print_status, print_step, print_success, print_warn};

const ENV_FILE: &str = ".env";
const API_KEY_VAR: &str = "SEEDSTR_API_KEY";

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn field_or(value: &Value, key: &str, fallback: &str) -> String {
    match value.get(key) {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Set `key=value` in a dotenv file, replacing an existing assignment or appending one.
pub(crate) fn persist_env_key(env_path: &Path, key: &str, value: &str) -> Result<()> {
    let existing = if env_path.exists() {
        std::fs::read_to_string(env_path)
            .with_context(|| format!("Failed to read {}", env_path.display()))?
    } else {
        String::new()
    };

    let assignment = format!("{}={}", key, value);
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let name = trimmed
                .strip_prefix("export ")
                .unwrap_or(trimmed)
                .split('=')
                .next()
                .unwrap_or("")
                .trim();
            if !replaced && name == key && trimmed.contains('=') {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    std::fs::write(env_path, out)
        .with_context(|| format!("Failed to write {}", env_path.display()))?;
    Ok(())
}

pub(super) async fn register(
    settings: &Settings,
    mut api: MarketplaceClient,
    wallet: Option<String>,
    owner_url: Option<String>,
) -> Result<()> {
    let wallet = wallet
        .unwrap_or_else(|| settings.solana_wallet_address.clone())
        .trim()
        .to_string();
    if wallet.is_empty() {
        bail!("Wallet address is required. Use --wallet or set SOLANA_WALLET_ADDRESS.");
    }
    let owner_url = owner_url.or_else(|| settings.seedstr_owner_url.clone());

    let data = api
        .register(&wallet, owner_url.as_deref())
        .await
        .context("Registration failed")?;
    let api_key = field_or(&data, "apiKey", "").trim().to_string();
    let agent_id = field_or(&data, "agentId", "").trim().to_string();

    if api_key.is_empty() {
        print_warn("Registered but no apiKey found in response");
    } else {
        let env_path = Path::new(ENV_FILE);
        persist_env_key(env_path, API_KEY_VAR, &api_key)?;
        api.set_api_key(&api_key);
        print_success(&format!(
            "Registration successful. API key saved to {}",
            env_path.display()
        ));
    }
    print_status(
        "Agent ID",
        if agent_id.is_empty() {
            "(not returned)"
        } else {
            agent_id.as_str()
        },
    );
    Ok(())
}

pub(super) async fn verify(api: &MarketplaceClient) -> Result<()> {
    let data = api.verify().await.context("Verify failed")?;
    print_success("Verify response:");
    println!("{}", pretty(&data));
    Ok(())
}

pub(super) async fn me(api: &MarketplaceClient) -> Result<()> {
    let data = api.get_me().await.context("Could not fetch profile")?;
    print_info("Agent profile:");
    println!("{}", pretty(&data));
    Ok(())
}

fn print_verification(me: &Value, instructions_label: &str) {
    let verification = me.get("verification").cloned().unwrap_or(Value::Null);
    print_status("Verified", &field_or(&verification, "isVerified", "None"));
    if let Some(instructions) = verification
        .get("verificationInstructions")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        print_step(instructions_label);
        println!("{}", instructions);
    }
}

pub(super) async fn status(api: &MarketplaceClient) -> Result<()> {
    let me = api.get_me().await.context("Status check failed")?;
    print_status("Agent ID", &field_or(&me, "id", "(unknown)"));
    print_status("Name", &field_or(&me, "name", "(unset)"));
    print_verification(&me, "Verification instructions:");
    print_status("Jobs completed", &field_or(&me, "jobsCompleted", "0"));
    Ok(())
}

pub(super) async fn profile(
    api: &MarketplaceClient,
    name: Option<&str>,
    bio: Option<&str>,
    picture: Option<&str>,
) -> Result<()> {
    if name.is_none() && bio.is_none() && picture.is_none() {
        bail!("Provide at least one field: --name, --bio, --picture");
    }
    let result = api
        .update_profile(name, bio, picture)
        .await
        .context("Profile update failed")?;
    print_success("Profile updated:");
    println!("{}", pretty(&result));
    Ok(())
}

pub(super) async fn skills(api: &MarketplaceClient, skills: &[String]) -> Result<()> {
    let result = api
        .update_skills(skills)
        .await
        .context("Skills update failed")?;
    print_success("Skills updated:");
    println!("{}", pretty(&result));
    Ok(())
}

pub(super) async fn skills_list(api: &MarketplaceClient) -> Result<()> {
    let data = api.list_skills().await.context("Could not list skills")?;
    print_info("Available skills:");
    println!("{}", pretty(&data));
    Ok(())
}

/// Apply a display name, bio and skills, then show what still blocks verification.
pub(super) async fn prepare(
    api: &MarketplaceClient,
    name: &str,
    bio: &str,
    skills: &[String],
) -> Result<()> {
    api.update_profile(Some(name), Some(bio), None)
        .await
        .context("Prepare failed")?;
    if !skills.is_empty()
        && let Err(e) = api.update_skills(skills).await
    {
        print_warn(&format!("Skills not updated: {}", e));
    }

    let me = api.get_me().await.context("Prepare failed")?;
    print_success("Preparation completed.");
    print_status("Agent ID", &field_or(&me, "id", "(unknown)"));
    print_status("Current name", &field_or(&me, "name", "(unset)"));
    print_status(
        "Current skills",
        &me.get("skills")
            .map(Value::to_string)
            .unwrap_or_else(|| "[]".to_string()),
    );
    print_verification(&me, "Tweet this for verification:");
    Ok(())
}
