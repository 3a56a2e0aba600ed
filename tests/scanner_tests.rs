mod common;

use common::*;
use fairdraw::stats::StatMetric;

#[tokio::test]
async fn transfers_credit_whole_tickets_only() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    // 2.5 tickets worth floors to 2; below one ticket counts nothing
    rpc.push_transfer(ALICE, COLLECTION, tokens(250_000), 50, 1);
    rpc.push_transfer(BOB, COLLECTION, tokens(99_999), 51, 2);
    // transfers elsewhere never count
    rpc.push_transfer(ALICE, POOL, tokens(500_000), 52, 3);
    engine.scan_tickets().await;

    let status = engine.raffle_status().await;
    assert_eq!(status.total_tickets, 2);

    let board = engine.leaderboard(StatMetric::Tickets, 10).await;
    assert_eq!(board, vec![(addr_key(&ALICE), fairdraw::WalletStats {
        tickets: 2,
        wins: 0,
        xp: 0,
    })]);
}

#[tokio::test]
async fn unconfirmed_blocks_wait_for_the_next_pass() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    // head 100 with 2 confirmations: block 99 is too fresh
    rpc.push_transfer(ALICE, COLLECTION, tokens(100_000), 99, 1);
    engine.scan_tickets().await;
    assert_eq!(engine.raffle_status().await.total_tickets, 0);

    // once the chain advances the same event is counted exactly once
    rpc.set_head(104);
    engine.scan_tickets().await;
    assert_eq!(engine.raffle_status().await.total_tickets, 1);

    engine.scan_tickets().await;
    assert_eq!(engine.raffle_status().await.total_tickets, 1);
}

#[tokio::test]
async fn scan_walks_the_range_in_chunks() {
    let rpc = MockRpc::new(10_000);
    let mut cfg = test_config();
    cfg.first_window = 5_000;
    cfg.chunk_size = 2_000;
    let engine = engine_with(
        cfg,
        rpc.clone(),
        fairdraw::MemStore::new(),
        fairdraw::EnvSecret::fixed(SECRET),
    );
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, tokens(100_000), 5_100, 1);
    rpc.push_transfer(BOB, COLLECTION, tokens(100_000), 9_900, 2);
    engine.scan_tickets().await;

    assert_eq!(
        rpc.log_calls(),
        vec![
            (5_001, 7_000),
            (7_001, 9_000),
            (9_001, 10_000),
        ]
    );
    assert_eq!(engine.raffle_status().await.total_tickets, 2);
}

#[tokio::test]
async fn transient_rpc_failures_are_retried() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, tokens(100_000), 50, 1);
    rpc.fail_next_logs(2);
    engine.scan_tickets().await;

    // two failures then a success, all against the same range
    let calls = rpc.log_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|&c| c == calls[0]));
    assert_eq!(engine.raffle_status().await.total_tickets, 1);
}

#[tokio::test]
async fn a_dead_chunk_is_skipped_and_scanning_moves_on() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, tokens(100_000), 50, 1);
    // one more failure than the retry limit allows: the chunk is given up on
    rpc.fail_next_logs(4);
    engine.scan_tickets().await;
    assert_eq!(engine.raffle_status().await.total_tickets, 0);

    // the cursor moved past the dead range; that transfer is gone, but new
    // events keep being counted
    rpc.set_head(110);
    rpc.push_transfer(BOB, COLLECTION, tokens(100_000), 105, 2);
    engine.scan_tickets().await;

    let calls = rpc.log_calls();
    assert_eq!(calls.last(), Some(&(99, 110)));
    assert_eq!(engine.raffle_status().await.total_tickets, 1);

    let board = engine.leaderboard(StatMetric::Tickets, 10).await;
    assert_eq!(board[0].0, addr_key(&BOB));
}

#[tokio::test]
async fn oversized_transfer_values_are_ignored() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, alloy_primitives::U256::MAX, 50, 1);
    rpc.push_transfer(BOB, COLLECTION, tokens(100_000), 51, 2);
    engine.scan_tickets().await;

    // the absurd transfer mints nothing, not even pot skim
    assert_eq!(engine.raffle_status().await.total_tickets, 1);
    assert_eq!(engine.jackpot_status().await.pot, tokens(10_000));
}

#[tokio::test]
async fn tickets_only_count_while_a_round_is_open() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());

    // no round yet: scanned but not credited
    rpc.push_transfer(ALICE, COLLECTION, tokens(100_000), 50, 1);
    engine.scan_tickets().await;

    engine.open_raffle().await.unwrap();
    let status = engine.raffle_status().await;
    assert_eq!(status.total_tickets, 0);
}

#[tokio::test]
async fn a_closed_round_ignores_later_transfers() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, tokens(300_000), 50, 1);
    rpc.push_transfer(BOB, COLLECTION, tokens(200_000), 51, 2);
    engine.scan_tickets().await;
    let close = engine.close_raffle().await.unwrap();

    // a qualifying buy lands after the close and must change nothing
    rpc.set_head(110);
    rpc.push_transfer(ALICE, COLLECTION, tokens(500_000), 105, 3);
    engine.scan_tickets().await;

    let status = engine.raffle_status().await;
    assert_eq!(status.total_tickets, 5);
    let round = status.round.unwrap();
    assert_eq!(round.snapshot_hash, Some(close.snapshot_hash.clone()));

    let csv = engine.export_ledger().await.unwrap();
    assert_eq!(
        csv,
        format!(
            "wallet,tickets\n{},3\n{},2",
            addr_key(&ALICE),
            addr_key(&BOB)
        )
    );
}

#[tokio::test]
async fn jackpot_pot_skims_ten_percent_of_buys() {
    let rpc = MockRpc::new(100);
    let engine = test_engine(rpc.clone());
    engine.open_raffle().await.unwrap();

    rpc.push_transfer(ALICE, COLLECTION, tokens(300_000), 50, 1);
    rpc.push_transfer(BOB, COLLECTION, tokens(200_000), 51, 2);
    engine.scan_tickets().await;

    let status = engine.jackpot_status().await;
    assert_eq!(status.pot, tokens(50_000));
}

#[tokio::test]
async fn pool_watcher_alerts_once_per_transaction() {
    let rpc = MockRpc::new(2_000);
    let engine = test_engine(rpc.clone());
    let sink = VecSink::default();

    // buy from the pool, sell into it, one below the alert floor
    rpc.push_transfer(POOL, ALICE, tokens(75_000), 1_900, 1);
    rpc.push_transfer(BOB, POOL, tokens(60_000), 1_901, 2);
    rpc.push_transfer(POOL, BOB, tokens(10_000), 1_902, 3);

    engine.scan_pool(&sink).await;
    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("BUY: 75000 tokens"));
    assert!(sent[1].starts_with("SELL: 60000 tokens"));

    // a second pass over the same window stays quiet
    engine.scan_pool(&sink).await;
    assert_eq!(sink.sent().len(), 2);
}

#[tokio::test]
async fn pool_watcher_is_a_noop_without_a_pool() {
    let rpc = MockRpc::new(2_000);
    let mut cfg = test_config();
    cfg.pool = None;
    let engine = engine_with(
        cfg,
        rpc.clone(),
        fairdraw::MemStore::new(),
        fairdraw::EnvSecret::fixed(SECRET),
    );
    let sink = VecSink::default();

    rpc.push_transfer(POOL, ALICE, tokens(75_000), 1_900, 1);
    engine.scan_pool(&sink).await;

    assert!(sink.sent().is_empty());
    assert!(rpc.log_calls().is_empty());
}
