mod commands;
mod view;

use anyhow::{Context, Result};
use commands::BellCommand;
use easel_lib::auth::{Credential, CredentialStore, FileCredentialStore};
use easel_lib::config::ClientConfig;
use easel_lib::{NotificationCenter, NotificationGateway};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|e| {
        eprintln!("Easel bell closed unexpectedly: {e:?}");
    }));

    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config = ClientConfig::load_default().context("Failed to load configuration")?;
    init_logging(config.log_level());
    log::info!("[easel-bell] Using API at {}", config.api_url);

    let store = Arc::new(FileCredentialStore::open_default()?);
    let gateway = Arc::new(NotificationGateway::new(&config, store.clone())?);
    let center = NotificationCenter::new(gateway, &config);

    let renderer = tokio::spawn(view::run(
        center.counter().subscribe(),
        center.gateway().subscribe_session(),
    ));

    if store.get().is_some() {
        center.activate();
    } else {
        println!("Not logged in. Use `login <token>` to start.");
    }
    println!("{}", view::badge_line(&center.counter().snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == BellCommand::Quit {
            break;
        }
        if let Err(e) = handle(&center, store.as_ref(), command).await {
            println!("Error: {:#}", e);
        }
    }

    renderer.abort();
    center.deactivate();
    Ok(())
}

async fn handle(
    center: &NotificationCenter,
    store: &dyn CredentialStore,
    command: BellCommand,
) -> Result<()> {
    let coordinator = center.coordinator();

    match command {
        BellCommand::Open => {
            let outcome = coordinator.open().await;
            if let Some(Err(e)) = &outcome.mark_all {
                println!("Failed to mark notifications as read: {}", e);
            }
            if outcome.is_open {
                print_panel(center);
            } else {
                println!("Panel closed");
            }
        }
        BellCommand::Close => {
            coordinator.close();
            println!("Panel closed");
        }
        BellCommand::MarkAll => {
            if let Err(e) = coordinator.mark_all_read().await {
                println!("Failed to mark notifications as read: {}", e);
            }
        }
        BellCommand::Read(id) => {
            coordinator.mark_read(&id).await?;
            println!("Marked {} as read", id);
        }
        BellCommand::List => print_panel(center),
        BellCommand::Refresh => {
            let (count, list) = center.refresh_now().await;
            log::debug!("[easel-bell] Refresh: counter {:?}, list {:?}", count, list);
            print_panel(center);
        }
        BellCommand::Status => {
            let snapshot = center.counter().snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        BellCommand::Login(token) => {
            store
                .set(Credential::new(token))
                .context("Failed to store credential")?;
            center.activate();
            println!("Logged in");
        }
        BellCommand::Logout => {
            center.deactivate();
            store.clear().context("Failed to clear credential")?;
            println!("Logged out");
        }
        BellCommand::Help => println!("{}", commands::HELP),
        BellCommand::Quit => {}
    }
    Ok(())
}

fn print_panel(center: &NotificationCenter) {
    let snapshot = center.list().snapshot();
    println!("{}", view::badge_line(&center.counter().snapshot()));
    for line in view::panel_lines(&snapshot, chrono::Utc::now()) {
        println!("{}", line);
    }
}

fn init_logging(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    // RUST_LOG still wins over the configured level
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
