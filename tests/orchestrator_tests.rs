//! Unit tests for transaction orchestration (mint, approve, swap)

use ethereum_types::U256;
use faucet_rebalancer::{AccountSession, PlanReport, SwapLeg};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    build_orchestrator, build_test_config, mount_method, mount_submission, receipt, rpc_error,
    rpc_result, submitted_raw_transactions, whole_tokens, DUMMY_HUB_TOKEN, DUMMY_ROUTER,
    DUMMY_SPOKE_TOKEN_A, DUMMY_SPOKE_TOKEN_B, TEST_ADDR_0, TEST_SECRET_0,
};

const APPROVE_SELECTOR: &str = "095ea7b3";
const SWAP_SELECTOR: &str = "414bf389";
const MINT_SELECTOR: &str = "1249c58b";

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn leg(token_in: &str, token_out: &str, amount: U256) -> SwapLeg {
    SwapLeg {
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
        amount,
    }
}

/// Makes the first `n` receipts succeed and every later one revert.
async fn mount_receipts_then_revert(server: &MockServer, n: u64) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(receipt("0x1")))
        .up_to_n_times(n)
        .with_priority(1)
        .mount(server)
        .await;
    mount_method(server, "eth_getTransactionReceipt", rpc_result(receipt("0x0"))).await;
}

/// Makes the first `n` receipts revert and every later one succeed.
async fn mount_reverts_then_receipts(server: &MockServer, n: u64) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(receipt("0x0")))
        .up_to_n_times(n)
        .with_priority(1)
        .mount(server)
        .await;
    mount_method(server, "eth_getTransactionReceipt", rpc_result(receipt("0x1"))).await;
}

async fn mount_submission_without_receipts(server: &MockServer) {
    mount_method(server, "eth_gasPrice", rpc_result(json!("0x3b9aca00"))).await;
    mount_method(server, "eth_getTransactionCount", rpc_result(json!("0x0"))).await;
    mount_method(
        server,
        "eth_sendRawTransaction",
        rpc_result(json!(test_helpers::DUMMY_TX_HASH)),
    )
    .await;
}

// ============================================================================
// MINT
// ============================================================================

/// What is tested: mint() sends mint() to the faucet token with the mint gas limit
/// Why: Claiming is a plain mint() call on the token contract
#[tokio::test]
async fn test_mint_submits_to_token() {
    let server = MockServer::start().await;
    mount_submission(&server).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let token = orchestrator.registry().by_address(DUMMY_SPOKE_TOKEN_A).unwrap().clone();
    let mined = orchestrator.mint(&session, &token).await.unwrap();
    assert!(mined.succeeded());

    let sent = submitted_raw_transactions(&server).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(MINT_SELECTOR));
    assert!(sent[0].contains(DUMMY_SPOKE_TOKEN_A.trim_start_matches("0x")));
    assert!(sent[0].contains("8307a120"), "mint gas limit 500000 not found");
}

/// What is tested: a reverted mint is an error
/// Why: A failed claim is logged and the cycle continues with swaps
#[tokio::test]
async fn test_mint_revert_is_error() {
    let server = MockServer::start().await;
    mount_submission_without_receipts(&server).await;
    mount_method(&server, "eth_getTransactionReceipt", rpc_result(receipt("0x0"))).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let token = orchestrator.registry().hub().clone();
    assert!(orchestrator.mint(&session, &token).await.is_err());
}

// ============================================================================
// SWAP LEGS
// ============================================================================

/// What is tested: a leg is an approve followed by a swap, each priced at gasPrice * 1.2
/// Why: The router can only pull tokens after the approve is mined
#[tokio::test]
async fn test_leg_approves_before_swapping() {
    let server = MockServer::start().await;
    mount_submission(&server).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator
        .execute_plan(&session, &[leg(DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_A, whole_tokens(75))])
        .await;
    assert_eq!(
        report,
        PlanReport {
            completed: 1,
            failed: 0,
            submitted: 2
        }
    );

    let sent = submitted_raw_transactions(&server).await;
    assert_eq!(sent.len(), 2);

    // approve(router, amount) on the input token
    assert!(sent[0].contains(APPROVE_SELECTOR));
    assert!(sent[0].contains(DUMMY_HUB_TOKEN.trim_start_matches("0x")));
    assert!(sent[0].contains(DUMMY_ROUTER.trim_start_matches("0x")));
    assert!(sent[0].contains("830186a0"), "approve gas limit 100000 not found");

    // exactInputSingle on the router
    assert!(sent[1].contains(SWAP_SELECTOR));
    assert!(sent[1].contains(DUMMY_SPOKE_TOKEN_A.trim_start_matches("0x")));
    assert!(sent[1].contains(TEST_ADDR_0.trim_start_matches("0x")));
    assert!(sent[1].contains("830493e0"), "swap gas limit 300000 not found");

    // 1 gwei * 1.2
    for raw in &sent {
        assert!(raw.contains("8447868c00"), "gas price 1.2 gwei not found");
    }
}

/// What is tested: a reverted approve fails the leg without submitting the swap
/// Why: Swapping without an allowance would revert anyway
#[tokio::test]
async fn test_failed_approve_skips_swap() {
    let server = MockServer::start().await;
    mount_submission_without_receipts(&server).await;
    mount_method(&server, "eth_getTransactionReceipt", rpc_result(receipt("0x0"))).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator
        .execute_plan(&session, &[leg(DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_A, whole_tokens(75))])
        .await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.submitted, 1);

    let sent = submitted_raw_transactions(&server).await;
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].contains(SWAP_SELECTOR));
}

/// What is tested: a failing leg does not stop the next leg
/// Why: Legs are independent; one bad pool must not block the others
#[tokio::test]
async fn test_failed_leg_does_not_stop_plan() {
    let server = MockServer::start().await;
    mount_submission_without_receipts(&server).await;
    // First approve reverts, the second leg's approve and swap succeed
    mount_reverts_then_receipts(&server, 1).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator
        .execute_plan(
            &session,
            &[
                leg(DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_A, whole_tokens(75)),
                leg(DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_B, whole_tokens(60)),
            ],
        )
        .await;
    assert_eq!(
        report,
        PlanReport {
            completed: 1,
            failed: 1,
            submitted: 3
        }
    );

    let sent = submitted_raw_transactions(&server).await;
    assert_eq!(sent.len(), 3);
    assert!(sent[0].contains(APPROVE_SELECTOR));
    assert!(sent[1].contains(APPROVE_SELECTOR));
    assert!(sent[2].contains(SWAP_SELECTOR));
    assert!(sent[2].contains(DUMMY_SPOKE_TOKEN_B.trim_start_matches("0x")));
}

/// What is tested: a reverted swap after a mined approve fails the leg
/// Why: The approve alone does not complete a leg
#[tokio::test]
async fn test_reverted_swap_fails_leg() {
    let server = MockServer::start().await;
    mount_submission_without_receipts(&server).await;
    mount_receipts_then_revert(&server, 1).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator
        .execute_plan(&session, &[leg(DUMMY_SPOKE_TOKEN_B, DUMMY_HUB_TOKEN, whole_tokens(1))])
        .await;
    assert_eq!(
        report,
        PlanReport {
            completed: 0,
            failed: 1,
            submitted: 2
        }
    );
}

/// What is tested: a nonce read failure fails the leg before anything is submitted
/// Why: Signing with a guessed nonce could replace a pending transaction
#[tokio::test]
async fn test_nonce_failure_fails_leg() {
    let server = MockServer::start().await;
    mount_method(&server, "eth_getTransactionCount", rpc_error(-32000, "node is syncing")).await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator
        .execute_plan(&session, &[leg(DUMMY_HUB_TOKEN, DUMMY_SPOKE_TOKEN_A, whole_tokens(75))])
        .await;
    assert_eq!(report.failed, 1);
    assert!(submitted_raw_transactions(&server).await.is_empty());
}

/// What is tested: an empty plan submits nothing
/// Why: Phase 2 is often empty when phase 1 failed
#[tokio::test]
async fn test_empty_plan() {
    let server = MockServer::start().await;
    let orchestrator = build_orchestrator(&build_test_config(&server.uri()));
    let session = AccountSession::open(TEST_SECRET_0).unwrap();

    let report = orchestrator.execute_plan(&session, &[]).await;
    assert_eq!(report, PlanReport::default());
    assert!(server.received_requests().await.unwrap().is_empty());
}
