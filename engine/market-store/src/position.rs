//! Position derivation from the transaction log
//!
//! Mirrors the `positions_mv` view: net quantity per (user, player) and the
//! volume-weighted cost of the buys made since the position was last flat.

use crate::models::{Position, TradeSide, Transaction};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Average cost is stored with this many decimal places
pub const AVERAGE_COST_SCALE: u32 = 4;

/// Running state of a single (user, player) holding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holding {
    pub quantity: i64,
    bought_quantity: i64,
    bought_cost: Decimal,
}

impl Holding {
    /// Apply one trade to the holding
    pub fn apply(&mut self, side: TradeSide, quantity: i64, price: Decimal) {
        match side {
            TradeSide::Buy => {
                self.quantity += quantity;
                self.bought_quantity += quantity;
                self.bought_cost += price * Decimal::from(quantity);
            }
            TradeSide::Sell => {
                self.quantity -= quantity;

                // A closed position starts a fresh cost basis
                if self.quantity <= 0 {
                    self.quantity = 0;
                    self.bought_quantity = 0;
                    self.bought_cost = Decimal::ZERO;
                }
            }
        }
    }

    pub fn average_cost(&self) -> Decimal {
        if self.bought_quantity == 0 {
            return Decimal::ZERO;
        }
        (self.bought_cost / Decimal::from(self.bought_quantity)).round_dp(AVERAGE_COST_SCALE)
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}

/// Rebuild positions by replaying transactions in id order
pub fn replay_positions(transactions: &[Transaction]) -> Vec<Position> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.id);

    let mut book: BTreeMap<(i64, i64), Holding> = BTreeMap::new();
    for tx in ordered {
        book.entry((tx.user_id, tx.player_id)).or_default().apply(tx.side, tx.quantity, tx.price);
    }

    book.into_iter()
        .filter(|(_, holding)| !holding.is_empty())
        .map(|((user_id, player_id), holding)| Position {
            user_id,
            player_id,
            quantity: holding.quantity,
            average_cost: holding.average_cost(),
        })
        .collect()
}
