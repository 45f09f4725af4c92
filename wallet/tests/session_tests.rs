mod common;

use std::time::Duration;

use common::{address, MockProvider};
use updelegate_common::chain::BASE_MAINNET;
use updelegate_wallet::{
    network_handler::NetworkHandler,
    provider::SharedProvider,
    session::{Session, SessionEvent},
};

#[tokio::test]
async fn test_connect_adopts_account_and_chain() {
    let mock = MockProvider::new(vec![address(1)], BASE_MAINNET.chain_id);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.connect().await.unwrap();

    assert_eq!(session.get_account().await, Some(address(1)));
    assert_eq!(session.get_chain_id().await, Some(BASE_MAINNET.chain_id));
    assert!(session.is_connected().await);
    assert!(session.is_on_target_chain().await);
    // already on the target chain: no switch requested
    assert_eq!(mock.calls("wallet_switchEthereumChain"), 0);
}

#[tokio::test]
async fn test_connect_with_no_accounts_stays_disconnected() {
    let mock = MockProvider::new(vec![], BASE_MAINNET.chain_id);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    // must not fail, simply stays disconnected
    session.connect().await.unwrap();

    assert_eq!(session.get_account().await, None);
    assert!(!session.is_connected().await);
    assert!(!session.is_connecting().await);
}

#[tokio::test]
async fn test_connect_on_wrong_chain_invokes_switch() {
    // wallet sits on Ethereum mainnet (chain 1)
    let mock = MockProvider::new(vec![address(1)], 1);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.connect().await.unwrap();

    assert_eq!(mock.calls("wallet_switchEthereumChain"), 1);
    // the local chain id only moves once the wallet pushes chainChanged
    assert_eq!(session.get_chain_id().await, Some(1));
    assert!(!session.is_on_target_chain().await);

    session.handle_chain_changed(BASE_MAINNET.chain_id).await;
    assert!(session.is_on_target_chain().await);
}

#[tokio::test]
async fn test_unrecognized_chain_falls_back_to_add_chain() {
    let mock = MockProvider::new(vec![address(1)], 1);
    *mock.switch_error_code.lock().unwrap() = Some(4902);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.switch_to_target().await.unwrap();

    assert_eq!(mock.calls("wallet_switchEthereumChain"), 1);
    assert_eq!(mock.calls("wallet_addEthereumChain"), 1);

    // the wallet received the full canonical chain definition
    let added = mock.added_chain.lock().unwrap().unwrap();
    assert_eq!(added.chain_id, 8453);
    assert_eq!(added.name, "Base");
    assert_eq!(added.rpc_url, "https://mainnet.base.org");
    assert_eq!(added.explorer_url, "https://basescan.org");
    assert_eq!(added.native_currency.symbol, "ETH");
    assert_eq!(added.native_currency.decimals, 18);
}

#[tokio::test]
async fn test_other_switch_errors_are_propagated() {
    let mock = MockProvider::new(vec![address(1)], 1);
    *mock.switch_error_code.lock().unwrap() = Some(4001);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    let result = session.switch_to_target().await;
    assert!(result.unwrap_err().is_user_rejection());
    assert_eq!(mock.calls("wallet_addEthereumChain"), 0);
}

#[tokio::test]
async fn test_disconnect_clears_state_even_when_revoke_fails() {
    let mock = MockProvider::new(vec![address(1)], BASE_MAINNET.chain_id);
    mock.fail_revoke.store(true, std::sync::atomic::Ordering::SeqCst);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.connect().await.unwrap();
    assert!(session.is_connected().await);

    session.disconnect().await.unwrap();

    assert_eq!(mock.calls("wallet_revokePermissions"), 1);
    assert_eq!(session.get_account().await, None);
    assert_eq!(session.get_chain_id().await, None);
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_check_connection_resumes_without_prompting() {
    let mock = MockProvider::new(vec![address(7)], BASE_MAINNET.chain_id);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.check_connection().await.unwrap();

    assert_eq!(session.get_account().await, Some(address(7)));
    assert_eq!(mock.calls("eth_accounts"), 1);
    // resuming never opens a wallet prompt
    assert_eq!(mock.calls("eth_requestAccounts"), 0);
}

#[tokio::test]
async fn test_delegation_gate_follows_chain_and_account() {
    let mock = MockProvider::new(vec![address(1)], 1);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    // disconnected: gate closed
    assert!(!session.can_delegate().await);

    session.connect().await.unwrap();
    // connected on the wrong chain: still closed
    assert!(!session.can_delegate().await);

    session.handle_chain_changed(BASE_MAINNET.chain_id).await;
    assert!(session.can_delegate().await);

    // wallet-side account removal closes the gate again
    session.handle_accounts_changed(vec![]).await;
    assert!(!session.can_delegate().await);
    assert_eq!(session.get_account().await, None);
}

#[tokio::test]
async fn test_session_events_are_published() {
    let mock = MockProvider::new(vec![address(1)], BASE_MAINNET.chain_id);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);
    let mut events = session.subscribe();

    session.connect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Connecting);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Connected {
            account: address(1),
            chain_id: BASE_MAINNET.chain_id
        }
    );

    session.disconnect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Disconnected);
}

#[tokio::test]
async fn test_account_change_updates_session() {
    let mock = MockProvider::new(vec![address(1)], BASE_MAINNET.chain_id);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);

    session.connect().await.unwrap();
    session.handle_accounts_changed(vec![address(2)]).await;

    assert_eq!(session.get_account().await, Some(address(2)));
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_event_handler_dispatches_provider_events() {
    let mock = MockProvider::new(vec![address(1)], 1);
    let provider: SharedProvider = mock.clone();
    let session = Session::new(provider, BASE_MAINNET);
    session.connect().await.unwrap();

    let handler = NetworkHandler::new(session.clone());
    handler.start().await.unwrap();
    assert!(handler.is_running().await);
    // a second start must be refused
    assert!(handler.start().await.is_err());

    mock.push_chain_changed(BASE_MAINNET.chain_id);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.is_on_target_chain().await);

    mock.push_accounts_changed(vec![]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.is_connected().await);

    handler.stop().await.unwrap();
    assert!(!handler.is_running().await);
}
