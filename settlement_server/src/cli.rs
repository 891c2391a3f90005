use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 19] = [
        "RUST_LOG",
        "SPG_HOST",
        "SPG_PORT",
        "SPG_DATABASE_URL",
        "SPG_GATEWAY_URL",
        "SPG_GATEWAY_TIMEOUT_SECS",
        "SPG_WEBHOOK_TIMEOUT_SECS",
        "SPG_TRANSACTION_FEE_RATE",
        "SPG_CONTINGENCY_FEE_RATE",
        "SPG_RECONCILIATION_INTERVAL_SECS",
        "SPG_RECONCILIATION_BATCH_SIZE",
        "SPG_DISABLE_RECONCILIATION_WORKER",
        "SPG_UNPAID_ORDER_TIMEOUT_HOURS",
        "SPG_NOTIFICATION_HMAC_CHECKS",
        "SPG_NOTIFIER_IP_WHITELIST",
        "SPG_USE_X_FORWARDED_FOR",
        "SPG_USE_FORWARDED",
        "SPG_LABEL_BASE_URL",
        "SPG_LABEL_URL_TTL_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
