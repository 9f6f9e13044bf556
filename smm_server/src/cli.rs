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
    // Tokens, API keys and shop secrets are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 19] = [
        "RUST_LOG",
        "SMM_HOST",
        "SMM_PORT",
        "SMM_DATABASE_URL",
        "SMM_ORDERS_ENDPOINT",
        "SMM_RATES_ENDPOINT",
        "SMM_PRICE_MARKUP_PERCENT",
        "SMM_CRYPTOMUS_MERCHANT",
        "SMM_CALLBACK_URL",
        "SMM_AAIO_SHOP_ID",
        "SMM_PAYOK_SHOP_ID",
        "SMM_BOT_LINK",
        "SMM_CHANNEL_ID",
        "SMM_ENABLE_BOTS",
        "SMM_TELEGRAM_API_URL",
        "SMM_RECONCILE_INTERVAL",
        "SMM_RATE_REFRESH_INTERVAL",
        "SMM_SUPERVISOR_SCAN_INTERVAL",
        "SMM_WORKER_LEASE_TTL",
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
