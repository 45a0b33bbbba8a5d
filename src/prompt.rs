//! Interactive boundary I/O: confirmation prompts and credential resolution.
//!
//! Kept thin and separate from the components that consume the answers —
//! adaptors receive already-resolved credentials, and orchestration code
//! only sees a yes/no.

use std::io::{BufRead, Write};

use tracing::info;

use crate::api::Credentials;
use crate::config::Config;

/// `Continue? (Y/n)` — any answer other than an explicit `n` continues.
pub fn confirm_default_yes(message: &str) -> bool {
    ask(message, true)
}

/// `Continue? (y/N)` — only an explicit `y` continues.
pub fn confirm_default_no(message: &str) -> bool {
    ask(message, false)
}

fn ask(message: &str, default_yes: bool) -> bool {
    let options = if default_yes { "(Y/n)" } else { "(y/N)" };
    print!("{} Continue? {}: ", message, options);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    let answer = answer.trim().to_ascii_uppercase();

    if default_yes {
        answer != "N"
    } else {
        answer == "Y"
    }
}

/// Resolve credentials from CLI flags, the configured default username, or
/// an interactive prompt, in that order.
pub fn resolve_credentials(
    config: &Config,
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Credentials> {
    let username = match username {
        Some(name) => name,
        None => match &config.general.default_username {
            Some(name) if !name.is_empty() => {
                info!(username = %name, "using default username from configuration");
                name.clone()
            }
            _ => read_line("Enter your username: ")?,
        },
    };

    let password = match password {
        Some(pass) => pass,
        None => read_line("Enter your password: ")?,
    };

    Ok(Credentials { username, password })
}

fn read_line(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut value = String::new();
    std::io::stdin().lock().read_line(&mut value)?;
    Ok(value.trim().to_string())
}
