mod account;
mod agent;

use anyhow::{Result, bail};
use console::style;

use crate::core::config::load_settings;
use crate::core::marketplace::MarketplaceClient;
use crate::core::pipeline::marketplace_http_client;
use crate::core::terminal::{self, GuideSection};

pub(crate) const DEFAULT_PREPARE_NAME: &str = "Seedstr Multi-Model Agent";
pub(crate) const DEFAULT_PREPARE_BIO: &str = "Autonomous multi-model agent for Seedstr. \
Uses Gemini and OpenAI with automatic failover for resilient responses.";
pub(crate) const DEFAULT_PREPARE_SKILLS: &str =
    "Research,API Integration,Data Analysis,Technical Writing,Web Scraping,Code Review";

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Account")
        .command("register", "Register agent and save API key to .env")
        .command("verify", "Trigger Seedstr verification check")
        .command("me", "Show current agent profile info")
        .command("status", "Show quick readiness status")
        .command("profile", "Update profile fields (--name, --bio, --picture)")
        .command("skills", "Update skills list (--set a,b,c)")
        .command("skills-list", "List available Seedstr skills")
        .command("prepare", "Apply defaults and print verification instructions")
        .print();

    GuideSection::new("Agent")
        .command("run", "Run the polling loop forever")
        .command("once", "Run one polling cycle and exit")
        .command("serve", "Start the agent loop behind a health server")
        .print();

    println!(
        "\n {} {} <command> [flags]\n",
        style("Usage:").bold(),
        style("seedstr-agent").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Register {
        wallet: Option<String>,
        owner_url: Option<String>,
    },
    Verify,
    Me,
    Status,
    Profile {
        name: Option<String>,
        bio: Option<String>,
        picture: Option<String>,
    },
    Skills {
        skills: Vec<String>,
    },
    SkillsList,
    Prepare {
        name: String,
        bio: String,
        skills: Vec<String>,
    },
    Run,
    Once,
    Serve {
        port: Option<u16>,
    },
    Help,
}

impl Command {
    fn requires_api_key(&self) -> bool {
        !matches!(self, Command::Register { .. } | Command::Help)
    }
}

/// Value following the first of `names` at or after `start`. A trailing flag with no value is ignored.
pub(crate) fn flag_value(args: &[String], start: usize, names: &[&str]) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if names.contains(&args[i].as_str()) {
            if i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
            return None;
        }
        i += 1;
    }
    None
}

pub(crate) fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_command(args: &[String]) -> Result<Command> {
    let Some(name) = args.get(1) else {
        return Ok(Command::Help);
    };

    let command = match name.as_str() {
        "register" => Command::Register {
            wallet: flag_value(args, 2, &["--wallet"]),
            owner_url: flag_value(args, 2, &["--owner-url"]),
        },
        "verify" => Command::Verify,
        "me" => Command::Me,
        "status" => Command::Status,
        "profile" => Command::Profile {
            name: flag_value(args, 2, &["--name"]),
            bio: flag_value(args, 2, &["--bio"]),
            picture: flag_value(args, 2, &["--picture"]),
        },
        "skills" => {
            let Some(raw) = flag_value(args, 2, &["--set"]) else {
                bail!("Usage: seedstr-agent skills --set \"python,solana,llm,automation\"");
            };
            let skills = split_skills(&raw);
            if skills.is_empty() {
                bail!("No valid skills found in --set");
            }
            Command::Skills { skills }
        }
        "skills-list" => Command::SkillsList,
        "prepare" => Command::Prepare {
            name: flag_value(args, 2, &["--name"]).unwrap_or_else(|| DEFAULT_PREPARE_NAME.to_string()),
            bio: flag_value(args, 2, &["--bio"]).unwrap_or_else(|| DEFAULT_PREPARE_BIO.to_string()),
            skills: split_skills(
                &flag_value(args, 2, &["--skills"])
                    .unwrap_or_else(|| DEFAULT_PREPARE_SKILLS.to_string()),
            ),
        },
        "run" => Command::Run,
        "once" => Command::Once,
        "serve" => {
            let port = match flag_value(args, 2, &["--port", "-p"]) {
                Some(raw) => Some(
                    raw.parse::<u16>()
                        .map_err(|_| anyhow::anyhow!("Invalid --port value: {}", raw))?,
                ),
                None => None,
            };
            Command::Serve { port }
        }
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("Unknown command '{}'. Run 'seedstr-agent help' for usage.", other),
    };
    Ok(command)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(&args)?;
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let settings = load_settings()?;
    crate::logging::init(&settings.log_level);

    if command.requires_api_key() && settings.seedstr_api_key.is_empty() {
        bail!("SEEDSTR_API_KEY is required for this command. Run register first.");
    }

    let api = MarketplaceClient::new(
        &settings.seedstr_base_url,
        &settings.seedstr_api_key,
        marketplace_http_client(&settings)?,
    );

    match command {
        Command::Register { wallet, owner_url } => {
            account::register(&settings, api, wallet, owner_url).await
        }
        Command::Verify => account::verify(&api).await,
        Command::Me => account::me(&api).await,
        Command::Status => account::status(&api).await,
        Command::Profile { name, bio, picture } => {
            account::profile(&api, name.as_deref(), bio.as_deref(), picture.as_deref()).await
        }
        Command::Skills { skills } => account::skills(&api, &skills).await,
        Command::SkillsList => account::skills_list(&api).await,
        Command::Prepare { name, bio, skills } => account::prepare(&api, &name, &bio, &skills).await,
        Command::Run => agent::run(&settings).await,
        Command::Once => agent::once(&settings).await,
        Command::Serve { port } => agent::serve(settings.clone(), port).await,
        Command::Help => Ok(()),
    }
}
