//! Unit tests for the execution planner - liquidity sequencing, short
//! covers, proportional scaling, and skip accounting.

use crate::constants::planner::ROUNDING_TOLERANCE;
use crate::exchange::types::Side;
use crate::pipeline::planner::ExecutionPlanner;
use crate::pipeline::types::{
    Action, PortfolioContext, PortfolioPosition, TradingDecision,
};

fn decision(symbol: &str, action: Action, pct: Option<u8>) -> TradingDecision {
    TradingDecision {
        symbol: symbol.to_string(),
        action,
        position_size_percent: pct,
        swap_from_symbol: None,
        confidence: 7,
        reasoning_summary: String::new(),
    }
}

fn position(symbol: &str, quantity: f64, market_value: f64) -> PortfolioPosition {
    PortfolioPosition {
        symbol: symbol.to_string(),
        quantity,
        market_value,
        unrealized_pl_percent: 0.0,
        avg_entry_price: None,
    }
}

fn portfolio(buying_power: f64, positions: Vec<PortfolioPosition>) -> PortfolioContext {
    PortfolioContext {
        total_equity: 100_000.0,
        buying_power,
        cash: buying_power,
        positions,
    }
}

// ============= Empty / all-HOLD =============

#[test]
fn test_no_decisions_yields_no_plan() {
    let planner = ExecutionPlanner::default();
    let plan = planner.build_plan(&[], &portfolio(10_000.0, vec![]));
    assert!(plan.is_none());
}

#[test]
fn test_all_hold_yields_empty_plan() {
    let planner = ExecutionPlanner::default();
    let decisions = vec![
        decision("AAPL", Action::Hold, None),
        decision("MSFT", Action::Hold, None),
    ];

    let plan = planner
        .build_plan(&decisions, &portfolio(10_000.0, vec![]))
        .unwrap();

    assert!(plan.orders.is_empty());
    assert!(!plan.scaling_applied);
    assert_eq!(plan.orders_skipped, 0);
    assert!(plan.notes.contains("No action required"));
}

// ============= Sell derivation (Scenario A) =============

#[test]
fn test_sell_half_of_long_position() {
    // Scenario A: AAPL qty=100, market_value=15000; SELL 50%
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(0.0, vec![position("AAPL", 100.0, 15_000.0)]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Sell, Some(50))], &ctx)
        .unwrap();

    assert_eq!(plan.orders.len(), 1);
    let order = &plan.orders[0];
    assert_eq!(order.side, Side::Sell);
    assert_eq!(order.shares, 50);
    assert_eq!(order.estimated_price, 150.0);
    assert_eq!(order.estimated_cost, 7_500.0);
    assert!(!order.is_cover);
    assert_eq!(plan.total_sell_proceeds, 7_500.0);
}

#[test]
fn test_sell_shares_floor_toward_zero() {
    // 3 shares at 33% -> 0.99 shares -> under one share, skipped
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(0.0, vec![position("AAPL", 3.0, 450.0)]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Sell, Some(33))], &ctx)
        .unwrap();

    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
}

// ============= Cover derivation (Scenario B) =============

#[test]
fn test_sell_of_short_becomes_cover_buy() {
    // Scenario B: TSLA qty=-20, market_value=-5000; SELL 100%
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(0.0, vec![position("TSLA", -20.0, -5_000.0)]);

    let plan = planner
        .build_plan(&[decision("TSLA", Action::Sell, Some(100))], &ctx)
        .unwrap();

    assert_eq!(plan.orders.len(), 1);
    let order = &plan.orders[0];
    assert!(order.is_cover);
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.shares, 20);
    assert_eq!(order.estimated_price, 250.0);
    assert_eq!(order.estimated_cost, 5_000.0);
    // Covers consume funds; they never count as liquidity
    assert_eq!(plan.total_sell_proceeds, 0.0);
}

#[test]
fn test_covers_take_priority_over_sells() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(
        0.0,
        vec![
            position("AAPL", 100.0, 15_000.0),
            position("TSLA", -20.0, -5_000.0),
        ],
    );
    // Decision order lists the ordinary sell first; the cover must still
    // come out ahead of it.
    let decisions = vec![
        decision("AAPL", Action::Sell, Some(50)),
        decision("TSLA", Action::Sell, Some(100)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    assert_eq!(plan.orders.len(), 2);
    assert!(plan.orders[0].is_cover);
    assert_eq!(plan.orders[0].priority, 1);
    assert_eq!(plan.orders[1].symbol, "AAPL");
    assert_eq!(plan.orders[1].priority, 2);
}

// ============= Skips (Scenario D) =============

#[test]
fn test_sell_without_size_percent_is_skipped() {
    // Scenario D: SELL missing position_size_percent
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(0.0, vec![position("AAPL", 100.0, 15_000.0)]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Sell, None)], &ctx)
        .unwrap();

    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
}

#[test]
fn test_sell_without_position_is_skipped() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![]);

    let plan = planner
        .build_plan(&[decision("GME", Action::Sell, Some(50))], &ctx)
        .unwrap();

    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
    assert!(plan.notes.contains("skipped"));
}

// ============= Buy estimation and scaling (Scenario C) =============

#[test]
fn test_buys_within_capital_are_not_scaled() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Buy, Some(50))], &ctx)
        .unwrap();

    assert!(!plan.scaling_applied);
    assert_eq!(plan.scaling_factor, None);
    assert_eq!(plan.orders.len(), 1);
    let order = &plan.orders[0];
    // 50% of 10000 at the 100.0 placeholder price
    assert_eq!(order.estimated_cost, 5_000.0);
    assert_eq!(order.shares, 50);
    assert_eq!(order.adjusted_size_percent, None);
}

#[test]
fn test_overcommitted_buys_scale_proportionally() {
    // Scenario C: buying_power=10000, two BUYs at 80% each (16000 total)
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![]);
    let decisions = vec![
        decision("AAPL", Action::Buy, Some(80)),
        decision("MSFT", Action::Buy, Some(80)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    assert!(plan.scaling_applied);
    assert_eq!(plan.scaling_factor, Some(0.625));
    assert_eq!(plan.orders.len(), 2);
    for order in &plan.orders {
        assert_eq!(order.estimated_cost, 5_000.0);
        assert_eq!(order.original_size_percent, 80);
        assert_eq!(order.adjusted_size_percent, Some(50));
        assert!(order.estimated_cost <= 8_000.0);
    }
    assert!(plan.total_buy_cost <= plan.available_buying_power + ROUNDING_TOLERANCE);
}

#[test]
fn test_buy_base_is_pre_sell_buying_power() {
    // The buy percent applies to PRE-sell buying power even though sells
    // raise the available figure.
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![position("AAPL", 100.0, 15_000.0)]);
    let decisions = vec![
        decision("AAPL", Action::Sell, Some(100)),
        decision("MSFT", Action::Buy, Some(50)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    assert_eq!(plan.total_sell_proceeds, 15_000.0);
    assert_eq!(plan.available_buying_power, 25_000.0);
    let buy = plan.orders.iter().find(|o| o.symbol == "MSFT").unwrap();
    // 50% of 10000, not of 25000
    assert_eq!(buy.estimated_cost, 5_000.0);
    assert!(!plan.scaling_applied);
}

#[test]
fn test_sell_liquidity_feeds_buy_feasibility() {
    // Buys exceed pre-sell capital but fit once sell proceeds land.
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![position("AAPL", 100.0, 10_000.0)]);
    let decisions = vec![
        decision("AAPL", Action::Sell, Some(100)),
        decision("MSFT", Action::Buy, Some(100)),
        decision("NVDA", Action::Buy, Some(90)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    // Demand 19000 against 20000 available: no scaling needed.
    assert!(!plan.scaling_applied);
    assert_eq!(plan.orders.len(), 3);
}

#[test]
fn test_buy_price_uses_held_average_entry() {
    let planner = ExecutionPlanner::default();
    let mut held = position("AAPL", 10.0, 2_000.0);
    held.avg_entry_price = Some(160.0);
    let ctx = portfolio(8_000.0, vec![held]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Buy, Some(40))], &ctx)
        .unwrap();

    let order = &plan.orders[0];
    assert_eq!(order.estimated_price, 160.0);
    // 3200 / 160 = 20 shares
    assert_eq!(order.shares, 20);
}

#[test]
fn test_buy_under_one_share_is_skipped() {
    let planner = ExecutionPlanner::default();
    // Tiny buying power: 1% of 150 = 1.50, under one placeholder-priced share
    let ctx = portfolio(150.0, vec![]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Buy, Some(1))], &ctx)
        .unwrap();

    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
}

// ============= SWAP expansion =============

#[test]
fn test_swap_expands_to_sell_and_buy() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![position("AAPL", 100.0, 15_000.0)]);

    let mut swap = decision("MSFT", Action::Swap, Some(50));
    swap.swap_from_symbol = Some("AAPL".to_string());

    let plan = planner.build_plan(&[swap], &ctx).unwrap();

    assert_eq!(plan.orders.len(), 2);
    let sell = &plan.orders[0];
    assert_eq!(sell.symbol, "AAPL");
    assert_eq!(sell.side, Side::Sell);
    assert_eq!(sell.shares, 50);
    let buy = &plan.orders[1];
    assert_eq!(buy.symbol, "MSFT");
    assert_eq!(buy.side, Side::Buy);
    assert!(sell.priority < buy.priority);
}

#[test]
fn test_swap_without_source_is_skipped() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(10_000.0, vec![]);

    let plan = planner
        .build_plan(&[decision("MSFT", Action::Swap, Some(50))], &ctx)
        .unwrap();

    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
}

// ============= Plan-wide invariants =============

#[test]
fn test_priorities_strictly_increase_cover_sell_buy() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(
        50_000.0,
        vec![
            position("AAPL", 100.0, 15_000.0),
            position("TSLA", -20.0, -5_000.0),
            position("AMZN", 40.0, 8_000.0),
        ],
    );
    let decisions = vec![
        decision("NVDA", Action::Buy, Some(20)),
        decision("AAPL", Action::Sell, Some(50)),
        decision("TSLA", Action::Sell, Some(100)),
        decision("AMZN", Action::Sell, Some(25)),
        decision("META", Action::Buy, Some(10)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    // Strictly increasing from 1
    for (i, order) in plan.orders.iter().enumerate() {
        assert_eq!(order.priority, i as u32 + 1);
    }

    // Blocks: covers, then sells, then buys
    let phases: Vec<&str> = plan
        .orders
        .iter()
        .map(|o| {
            if o.is_cover {
                "cover"
            } else if o.side == Side::Sell {
                "sell"
            } else {
                "buy"
            }
        })
        .collect();
    assert_eq!(phases, vec!["cover", "sell", "sell", "buy", "buy"]);

    // Within blocks, decision order is preserved
    assert_eq!(plan.orders[1].symbol, "AAPL");
    assert_eq!(plan.orders[2].symbol, "AMZN");
    assert_eq!(plan.orders[3].symbol, "NVDA");
    assert_eq!(plan.orders[4].symbol, "META");
}

#[test]
fn test_available_buying_power_identity() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(12_345.0, vec![position("AAPL", 100.0, 15_000.0)]);
    let decisions = vec![
        decision("AAPL", Action::Sell, Some(30)),
        decision("MSFT", Action::Buy, Some(10)),
    ];

    let plan = planner.build_plan(&decisions, &ctx).unwrap();

    assert_eq!(
        plan.available_buying_power,
        12_345.0 + plan.total_sell_proceeds
    );
}

#[test]
fn test_zero_buying_power_scales_buys_to_nothing() {
    let planner = ExecutionPlanner::default();
    let ctx = portfolio(0.0, vec![]);

    let plan = planner
        .build_plan(&[decision("AAPL", Action::Buy, Some(100))], &ctx)
        .unwrap();

    // Demand 0 against 0 available: the estimate itself is zero, so no
    // scaling triggers and the sub-share buy is skipped.
    assert!(plan.orders.is_empty());
    assert_eq!(plan.orders_skipped, 1);
    assert!(!plan.scaling_applied);
}
