//! Buy and sell planning against locked ledger state
//!
//! Planners never touch the store. They see the user, player and position rows
//! the store has locked and either return the writes to apply or refuse.

use market_store::{TradePlan, TradeRejection, TradeSide, TradeSnapshot};
use rust_decimal::Decimal;

/// Plan a buy at the player's current value
pub fn plan_buy(
    snapshot: &TradeSnapshot,
    user_id: i64,
    player_id: i64,
    quantity: i64,
    reserve_capacity: bool,
) -> Result<TradePlan, TradeRejection> {
    if quantity <= 0 {
        return Err(TradeRejection::InvalidQuantity { quantity });
    }
    let user = snapshot.user.as_ref().ok_or(TradeRejection::UserNotFound { user_id })?;
    let player = snapshot.player.as_ref().ok_or(TradeRejection::PlayerNotFound { player_id })?;

    let cost = player.value * Decimal::from(quantity);
    if cost > user.currency {
        return Err(TradeRejection::InsufficientFunds { cost, balance: user.currency });
    }
    if quantity > player.remaining_capacity {
        return Err(TradeRejection::CapacityExceeded {
            requested: quantity,
            remaining: player.remaining_capacity,
        });
    }

    Ok(TradePlan {
        side: TradeSide::Buy,
        quantity,
        price: player.value,
        currency_delta: -cost,
        capacity_delta: if reserve_capacity { -quantity } else { 0 },
    })
}

/// Plan a sell at the player's current value; proceeds ignore average cost
pub fn plan_sell(
    snapshot: &TradeSnapshot,
    user_id: i64,
    player_id: i64,
    quantity: i64,
    reserve_capacity: bool,
) -> Result<TradePlan, TradeRejection> {
    if quantity <= 0 {
        return Err(TradeRejection::InvalidQuantity { quantity });
    }
    if snapshot.user.is_none() {
        return Err(TradeRejection::UserNotFound { user_id });
    }
    let player = snapshot.player.as_ref().ok_or(TradeRejection::PlayerNotFound { player_id })?;

    let held = match &snapshot.position {
        Some(position) if position.quantity > 0 => position.quantity,
        _ => return Err(TradeRejection::NoPosition { user_id, player_id }),
    };
    if quantity > held {
        return Err(TradeRejection::QuantityExceedsPosition { requested: quantity, held });
    }

    // Reserved capacity never grows past the total
    let released = if reserve_capacity {
        quantity.min(player.total_capacity - player.remaining_capacity).max(0)
    } else {
        quantity
    };

    Ok(TradePlan {
        side: TradeSide::Sell,
        quantity,
        price: player.value,
        currency_delta: player.value * Decimal::from(quantity),
        capacity_delta: released,
    })
}
