use std::{fs::File, io::Write, path::Path, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use updelegate_common::{
    async_handler,
    chain::BASE_MAINNET,
    crypto::Address,
    prompt::{
        argument::{Arg, ArgType, ArgumentManager},
        command::{Command, CommandError, CommandHandler, CommandManager},
        Color, Prompt, PromptError, ShareablePrompt,
    },
    utils::{format_timestamp, sanitize_ws_address, spawn_task},
};
use updelegate_wallet::{
    config::Config,
    delegation::{DelegationController, SharedDelegationController},
    error::WalletError,
    network_handler::{NetworkHandler, SharedNetworkHandler},
    provider::{ProviderApi, SharedProvider},
    session::{Session, SessionEvent, SharedSession},
};

// User-facing outcome of a delegation attempt; all failure kinds collapse
// to the same message
const DELEGATION_FAILED_MESSAGE: &str = "Failed to delegate voting rights. Please try again.";

#[tokio::main]
async fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!("Provided config file path is required to generate the template with --config-file");
        return Ok(());
    }

    let log_config = &config.log;
    let prompt = Prompt::new(
        log_config.log_level,
        &log_config.logs_path,
        &log_config.filename_log,
        log_config.disable_file_logging,
        log_config.disable_file_log_date_based,
        log_config.disable_log_color,
        !log_config.disable_interactive_mode,
        log_config.logs_modules.clone(),
        log_config.file_log_level.unwrap_or(log_config.log_level),
    )?;

    let command_manager = CommandManager::new_with_batch_mode(prompt.clone(), config.is_exec_mode());
    command_manager.register_default_commands()?;

    let controller = DelegationController::new();
    command_manager.store_in_context(controller.clone())?;

    let mut session: Option<SharedSession> = None;
    let mut network_handler: Option<SharedNetworkHandler> = None;
    if !config.network_handler.offline_mode {
        let address = sanitize_ws_address(&config.network_handler.provider_address);
        match ProviderApi::new(address.clone()).await {
            Ok(api) => {
                let provider: SharedProvider = Arc::new(api);
                let wallet_session = Session::new(provider.clone(), BASE_MAINNET);

                let handler = NetworkHandler::new(wallet_session.clone());
                handler.start().await?;

                // surface wallet-side state changes in the terminal
                let mut events = wallet_session.subscribe();
                spawn_task("session-events", async move {
                    while let Ok(event) = events.recv().await {
                        match event {
                            SessionEvent::Disconnected => info!("Wallet session ended"),
                            SessionEvent::AccountChanged { account } => {
                                info!("Active account is now {}", account.to_short_string())
                            }
                            SessionEvent::ChainChanged { chain_id } => {
                                info!("Wallet switched to chain {}", chain_id)
                            }
                            SessionEvent::Connected { .. } | SessionEvent::Connecting => {}
                        }
                    }
                });

                // silently resume a previously authorized session
                if let Err(e) = wallet_session.check_connection().await {
                    warn!("Could not check for an existing session: {:#}", e);
                }
                if let Some(account) = wallet_session.get_account().await {
                    controller.init(provider.clone(), account).await;
                    if let Err(e) = controller.refresh().await {
                        warn!("Initial contract data load failed: {:#}", e);
                    }
                }

                command_manager.store_in_context(wallet_session.clone())?;
                session = Some(wallet_session);
                network_handler = Some(handler);
            }
            Err(e) => {
                error!("No wallet provider reachable at {}: {:#}", address, e);
                info!("Install or start a wallet agent, then restart this application");
            }
        }
    }

    register_wallet_commands(&command_manager)?;

    if config.is_exec_mode() {
        if let Some(cmd) = config.get_exec_command() {
            if log::log_enabled!(log::Level::Info) {
                info!("Executing command: {}", cmd);
            }
            if let Err(e) = command_manager.handle_command(cmd.clone()).await {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error executing command: {:#}", e);
                }
            }
        }
    } else {
        let builder_session = session.clone();
        let builder_controller = controller.clone();
        let builder_prompt = prompt.clone();
        let message_builder: updelegate_common::prompt::PromptMessageBuilder =
            Box::new(move || {
                let session = builder_session.clone();
                let controller = builder_controller.clone();
                let prompt = builder_prompt.clone();
                Box::pin(build_prompt_message(session, controller, prompt))
            });

        if let Err(e) = prompt
            .start(Duration::from_millis(1000), message_builder, Some(&command_manager))
            .await
        {
            if log::log_enabled!(log::Level::Error) {
                error!("Error while running prompt: {:#}", e);
            }
        }
    }

    if let Some(handler) = network_handler {
        if let Err(e) = handler.stop().await {
            warn!("Error while stopping the event handler: {:#}", e);
        }
    }
    if let Some(session) = session {
        if let Err(e) = session.get_provider().disconnect().await {
            warn!("Error while closing the provider connection: {:#}", e);
        }
    }

    Ok(())
}

async fn build_prompt_message(
    session: Option<SharedSession>,
    controller: SharedDelegationController,
    prompt: ShareablePrompt,
) -> Result<String, PromptError> {
    let state = match session.as_ref() {
        Some(session) => match session.get_account().await {
            Some(account) => {
                let network = if session.is_on_target_chain().await {
                    prompt.colorize_string(Color::Green, session.get_target().name)
                } else {
                    prompt.colorize_string(Color::Yellow, "wrong network")
                };
                format!(
                    "{} | {}",
                    prompt.colorize_string(Color::Cyan, &account.to_short_string()),
                    network
                )
            }
            None => prompt.colorize_string(Color::Red, "disconnected"),
        },
        None => prompt.colorize_string(Color::Red, "offline"),
    };

    let busy = if controller.is_loading() { " (busy)" } else { "" };
    Ok(format!("updelegate [{}]{} >> ", state, busy))
}

fn register_wallet_commands(manager: &CommandManager) -> Result<(), CommandError> {
    manager.add_command(Command::new(
        "status",
        "Show the wallet connection state",
        CommandHandler::Async(async_handler!(status)),
    ))?;
    manager.add_command(Command::new(
        "connect",
        "Connect an account from your wallet",
        CommandHandler::Async(async_handler!(connect)),
    ))?;
    manager.add_command(Command::new(
        "disconnect",
        "Revoke the wallet permission and clear the session",
        CommandHandler::Async(async_handler!(disconnect)),
    ))?;
    manager.add_command(Command::new(
        "switch_network",
        "Ask the wallet to switch to the Base network",
        CommandHandler::Async(async_handler!(switch_network)),
    ))?;
    manager.add_command(Command::new(
        "refresh",
        "Reload stewards, stats and delegation info from the contract",
        CommandHandler::Async(async_handler!(refresh)),
    ))?;
    manager.add_command(Command::new(
        "stewards",
        "List the active stewards",
        CommandHandler::Async(async_handler!(stewards)),
    ))?;
    manager.add_command(Command::new(
        "stats",
        "Show the delegation statistics",
        CommandHandler::Async(async_handler!(stats)),
    ))?;
    manager.add_command(Command::new(
        "delegation",
        "Show your current delegation",
        CommandHandler::Async(async_handler!(delegation)),
    ))?;
    manager.add_command(Command::with_optional_arguments(
        "delegate_self",
        "Delegate your voting rights to your own address",
        vec![Arg::new("confirm", ArgType::Bool)],
        CommandHandler::Async(async_handler!(delegate_self)),
    ))?;
    manager.add_command(Command::with_optional_arguments(
        "delegate_steward",
        "Delegate your voting rights to a steward",
        vec![
            Arg::new("address", ArgType::String),
            Arg::new("confirm", ArgType::Bool),
        ],
        CommandHandler::Async(async_handler!(delegate_steward)),
    ))?;
    manager.add_command(Command::with_optional_arguments(
        "delegate_custom",
        "Delegate your voting rights to any address",
        vec![
            Arg::new("address", ArgType::String),
            Arg::new("confirm", ArgType::Bool),
        ],
        CommandHandler::Async(async_handler!(delegate_custom)),
    ))?;

    Ok(())
}

fn get_session(manager: &CommandManager) -> Result<SharedSession, CommandError> {
    let context = manager.get_context().lock()?;
    context.get_optional::<SharedSession>().cloned().ok_or_else(|| {
        CommandError::Any(anyhow!(
            "No wallet provider is reachable. Install or start a wallet agent and restart this application"
        ))
    })
}

fn get_controller(manager: &CommandManager) -> Result<SharedDelegationController, CommandError> {
    let context = manager.get_context().lock()?;
    let controller = context.get::<SharedDelegationController>()?;
    Ok(controller.clone())
}

// The delegation surface is gated on a connected account on the target
// network; the loading flag blocks overlapping submissions from the CLI
async fn ensure_delegation_allowed(
    manager: &CommandManager,
    session: &SharedSession,
    controller: &SharedDelegationController,
) -> Result<bool, CommandError> {
    if !session.is_connected().await {
        manager.error("Connect your wallet first");
        return Ok(false);
    }
    if !session.is_on_target_chain().await {
        manager.error(format!(
            "This application requires the {} network. Use 'switch_network' first",
            session.get_target().name
        ));
        return Ok(false);
    }
    if controller.is_loading() {
        manager.warn("A delegation is already in progress, please wait");
        return Ok(false);
    }
    Ok(true)
}

async fn read_confirmation(
    manager: &CommandManager,
    args: &mut ArgumentManager,
) -> Result<bool, CommandError> {
    if args.has_argument("confirm") {
        Ok(args.get_value("confirm")?.to_bool()?)
    } else if manager.is_batch_mode() {
        // auto-confirm in batch mode when no explicit confirmation parameter
        Ok(true)
    } else {
        let prompt = manager.get_prompt();
        prompt
            .ask_confirmation()
            .await
            .context("Error while confirming action")
            .map_err(CommandError::Any)
    }
}

async fn read_delegate_address(
    manager: &CommandManager,
    args: &mut ArgumentManager,
) -> Result<Option<Address>, CommandError> {
    let input = if args.has_argument("address") {
        args.get_value("address")?.to_string_value()?
    } else if manager.is_batch_mode() {
        return Err(CommandError::MissingArgument("address".to_string()));
    } else {
        let prompt = manager.get_prompt();
        prompt
            .read_input(prompt.colorize_string(Color::Green, "Address: "))
            .await
            .context("Error while reading address")?
    };

    // form-level check first: exactly 42 characters with a 0x prefix
    if !Address::has_valid_format(&input) {
        manager.error("Please enter a valid Ethereum address");
        return Ok(None);
    }

    let address = Address::from_string(&input)
        .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    Ok(Some(address))
}

async fn status(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let controller = get_controller(manager)?;
    let session = {
        let context = manager.get_context().lock()?;
        context.get_optional::<SharedSession>().cloned()
    };

    match session {
        None => {
            manager.message("No wallet provider is reachable. Install or start a wallet agent.");
        }
        Some(session) => match session.get_account().await {
            Some(account) => {
                manager.message(format!("Account: {}", account));
                if let Some(chain_id) = session.get_chain_id().await {
                    manager.message(format!("Chain id: {}", chain_id));
                }
                if session.is_on_target_chain().await {
                    manager.message(format!("Connected to the {} network", session.get_target().name));
                } else {
                    manager.warn(format!(
                        "This application requires the {} network to function properly. Use 'switch_network'",
                        session.get_target().name
                    ));
                }
                if controller.is_loading() {
                    manager.message("A delegation or refresh is in progress");
                }
            }
            None => {
                manager.message("Not connected. Use 'connect' to link your wallet");
            }
        },
    }
    Ok(())
}

async fn connect(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    if session.is_connected().await {
        manager.message("Already connected");
        return Ok(());
    }

    manager.message("Requesting wallet connection...");
    if let Err(e) = session.connect().await {
        if e.is_user_rejection() {
            manager.error("Connection request was rejected");
        } else {
            error!("Error connecting wallet: {:#}", e);
            manager.error("Could not connect the wallet");
        }
        return Ok(());
    }

    match session.get_account().await {
        Some(account) => {
            manager.message(format!("Connected with {}", account.to_short_string()));

            let controller = get_controller(manager)?;
            controller
                .init(session.get_provider().clone(), account)
                .await;
            if let Err(e) = controller.refresh().await {
                error!("Error loading contract data: {:#}", e);
            }

            if !session.is_on_target_chain().await {
                manager.warn(format!(
                    "Network switch to {} is pending, confirm it in your wallet",
                    session.get_target().name
                ));
            }
        }
        None => manager.warn("No account was authorized"),
    }
    Ok(())
}

async fn disconnect(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    if !session.is_connected().await {
        manager.message("Not connected");
        return Ok(());
    }

    session
        .disconnect()
        .await
        .context("Error while disconnecting")?;
    let controller = get_controller(manager)?;
    controller.teardown().await;

    manager.message("Disconnected, local session cleared");
    Ok(())
}

async fn switch_network(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    if !session.is_connected().await {
        manager.error("Connect your wallet first");
        return Ok(());
    }
    if session.is_on_target_chain().await {
        manager.message(format!("Already on the {} network", session.get_target().name));
        return Ok(());
    }

    match session.switch_to_target().await {
        Ok(()) => manager.message(format!(
            "Switch to {} requested, confirm it in your wallet",
            session.get_target().name
        )),
        Err(e) => {
            if e.is_user_rejection() {
                manager.error("Network switch was rejected");
            } else {
                error!("Error switching network: {:#}", e);
                manager.error("Could not switch the network");
            }
        }
    }
    Ok(())
}

async fn refresh(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let controller = get_controller(manager)?;
    if controller.is_loading() {
        manager.warn("A delegation or refresh is already in progress");
        return Ok(());
    }

    match controller.refresh().await {
        Ok(()) => manager.message("Contract data refreshed"),
        Err(WalletError::Uninitialized) => manager.error("Connect your wallet first"),
        Err(e) => {
            error!("Error loading contract data: {:#}", e);
            // a failed cycle keeps whatever was loaded before it
            manager.error("Refresh failed, previously loaded data is kept");
        }
    }
    Ok(())
}

async fn stewards(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let controller = get_controller(manager)?;
    let snapshots = controller.get_snapshots().await;

    if snapshots.stewards.is_empty() {
        manager.message("No stewards loaded. Use 'refresh' after connecting your wallet");
        return Ok(());
    }

    manager.message("Active stewards:");
    for steward in snapshots.stewards {
        manager.message(format!(
            "- {} ({}): {} delegations",
            steward.name, steward.address, steward.delegation_count
        ));
    }
    manager.message("Delegate with: delegate_steward <address>");
    Ok(())
}

async fn stats(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let controller = get_controller(manager)?;
    let snapshots = controller.get_snapshots().await;

    match snapshots.stats {
        Some(stats) => {
            manager.message(format!("Total delegations: {}", stats.total));
            manager.message(format!("- to self: {}", stats.to_self));
            manager.message(format!("- to stewards: {}", stats.steward));
            manager.message(format!("- to custom addresses: {}", stats.custom));
        }
        None => manager.message("No statistics loaded. Use 'refresh' after connecting your wallet"),
    }
    Ok(())
}

async fn delegation(manager: &CommandManager, _: ArgumentManager) -> Result<(), CommandError> {
    let controller = get_controller(manager)?;
    let snapshots = controller.get_snapshots().await;

    match snapshots.delegation {
        Some(info) if info.active => {
            manager.message(format!("Delegate: {}", info.delegate));
            if let Some(kind) = info.kind {
                manager.message(format!("Delegation type: {}", kind));
            }
            manager.message(format!("Since: {}", format_timestamp(info.timestamp)));
        }
        Some(_) => manager.message("No active delegation"),
        None => manager.message("No delegation info loaded. Use 'refresh' after connecting your wallet"),
    }
    Ok(())
}

async fn delegate_self(manager: &CommandManager, mut args: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    let controller = get_controller(manager)?;
    if !ensure_delegation_allowed(manager, &session, &controller).await? {
        return Ok(());
    }

    // the target is always the connected account itself
    if let Some(account) = session.get_account().await {
        manager.message(format!(
            "Delegating voting rights to your own address {}",
            account.to_short_string()
        ));
    }
    if !read_confirmation(manager, &mut args).await? {
        manager.message("Delegation has been aborted");
        return Ok(());
    }

    match controller.delegate_to_self().await {
        Ok(hash) => {
            manager.message(format!("Transaction {} confirmed", hash));
            manager.message("Successfully delegated voting rights to yourself!");
        }
        Err(e) => {
            error!("Error delegating to self: {:#}", e);
            manager.error(DELEGATION_FAILED_MESSAGE);
        }
    }
    Ok(())
}

async fn delegate_steward(manager: &CommandManager, mut args: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    let controller = get_controller(manager)?;
    if !ensure_delegation_allowed(manager, &session, &controller).await? {
        return Ok(());
    }

    let steward = match read_delegate_address(manager, &mut args).await? {
        Some(address) => address,
        None => return Ok(()),
    };

    manager.message(format!("Delegating voting rights to steward {}", steward.to_short_string()));
    if !read_confirmation(manager, &mut args).await? {
        manager.message("Delegation has been aborted");
        return Ok(());
    }

    match controller.delegate_to_steward(steward).await {
        Ok(hash) => {
            manager.message(format!("Transaction {} confirmed", hash));
            manager.message("Successfully delegated voting rights to steward!");
        }
        Err(e) => {
            error!("Error delegating to steward: {:#}", e);
            manager.error(DELEGATION_FAILED_MESSAGE);
        }
    }
    Ok(())
}

async fn delegate_custom(manager: &CommandManager, mut args: ArgumentManager) -> Result<(), CommandError> {
    let session = get_session(manager)?;
    let controller = get_controller(manager)?;
    if !ensure_delegation_allowed(manager, &session, &controller).await? {
        return Ok(());
    }

    let delegate = match read_delegate_address(manager, &mut args).await? {
        Some(address) => address,
        None => return Ok(()),
    };

    manager.message(format!("Delegating voting rights to {}", delegate.to_short_string()));
    if !read_confirmation(manager, &mut args).await? {
        manager.message("Delegation has been aborted");
        return Ok(());
    }

    match controller.delegate_to_custom(delegate).await {
        Ok(hash) => {
            manager.message(format!("Transaction {} confirmed", hash));
            manager.message("Successfully delegated voting rights to custom address!");
        }
        Err(e) => {
            error!("Error delegating to custom address: {:#}", e);
            manager.error(DELEGATION_FAILED_MESSAGE);
        }
    }
    Ok(())
}
