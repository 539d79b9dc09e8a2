//! Deterministic player value formula

use crate::config::ValueWeights;
use market_store::{CareerStats, SeasonStats};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cubic Hermite ease: 0 at 0, 1 at 1, flat at both ends
pub fn smoothstep(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Every intermediate of one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBreakdown {
    pub season_value: f64,
    pub career_value: f64,
    pub base: f64,
    pub demand: f64,
    pub demand_multiplier: f64,
    pub value: f64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ValueCalculator {
    weights: ValueWeights,
}

impl ValueCalculator {
    pub fn new(weights: ValueWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ValueWeights {
        &self.weights
    }

    /// Zero unless the player cleared the games-played gate
    pub fn season_value(&self, season: Option<&SeasonStats>) -> f64 {
        let Some(season) = season else {
            return 0.0;
        };
        if season.line.games_played <= self.weights.min_games_played {
            return 0.0;
        }

        let w = &self.weights;
        let line = &season.line;
        line.points_per_game * w.season_ppg
            + line.assists_per_game * w.season_apg
            + line.rebounds_per_game * w.season_rpg
            + line.steals_per_game * w.season_spg
            + line.blocks_per_game * w.season_bpg
    }

    /// Computed from lifetime totals whenever they exist
    pub fn career_value(&self, career: Option<&CareerStats>) -> f64 {
        let Some(career) = career else {
            return 0.0;
        };

        let w = &self.weights;
        career.points * w.career_points
            + career.rebounds * w.career_rebounds
            + career.assists * w.career_assists
            + career.steals * w.career_steals
            + career.blocks * w.career_blocks
            + career.minutes * w.career_minutes
    }

    pub fn demand_multiplier(&self, demand: f64) -> f64 {
        1.0 + smoothstep(demand) * self.weights.demand_scaling
    }

    /// Clamp to the floor and convert to a two-decimal price
    pub fn to_price(&self, value: f64) -> Decimal {
        let floor = Decimal::from_f64(self.weights.min_value).unwrap_or(Decimal::TEN).round_dp(2);
        let floored = value.max(self.weights.min_value);
        match Decimal::from_f64(floored) {
            Some(price) => price.round_dp(2).max(floor),
            None => floor,
        }
    }

    pub fn calculate(
        &self,
        season: Option<&SeasonStats>,
        career: Option<&CareerStats>,
        demand: f64,
    ) -> ValueBreakdown {
        let season_value = self.season_value(season);
        let career_value = self.career_value(career);
        let base = season_value * self.weights.season_mult + career_value * self.weights.career_mult;

        let demand = if demand.is_finite() { demand.clamp(0.0, 1.0) } else { 0.0 };
        let demand_multiplier = self.demand_multiplier(demand);

        let raw = base * demand_multiplier;
        let value = if raw.is_finite() { raw.max(self.weights.min_value) } else { self.weights.min_value };

        ValueBreakdown {
            season_value,
            career_value,
            base,
            demand,
            demand_multiplier,
            value,
            price: self.to_price(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_store::{PerMode, StatLine};
    use proptest::prelude::*;

    fn season(games: i32, ppg: f64, apg: f64, rpg: f64, spg: f64, bpg: f64) -> SeasonStats {
        SeasonStats {
            external_id: 1,
            season: "2025-26".to_string(),
            line: StatLine {
                games_played: games,
                points_per_game: ppg,
                assists_per_game: apg,
                rebounds_per_game: rpg,
                steals_per_game: spg,
                blocks_per_game: bpg,
                ..StatLine::default()
            },
        }
    }

    fn career(points: f64, rebounds: f64, assists: f64, steals: f64, blocks: f64, minutes: f64) -> CareerStats {
        CareerStats {
            external_id: 1,
            per_mode: PerMode::Totals,
            games_played: 500,
            minutes,
            points,
            rebounds,
            assists,
            steals,
            blocks,
            fg_pct: 0.0,
            fg3_pct: 0.0,
            ft_pct: 0.0,
        }
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
    }

    #[test]
    fn test_season_gate_is_strict() {
        let calc = ValueCalculator::default();
        assert_eq!(calc.season_value(Some(&season(10, 30.0, 5.0, 5.0, 1.0, 1.0))), 0.0);
        assert_eq!(calc.season_value(Some(&season(11, 30.0, 5.0, 5.0, 1.0, 1.0))), 56.0);
    }

    #[test]
    fn test_full_formula() {
        let calc = ValueCalculator::default();
        let s = season(20, 25.0, 5.0, 10.0, 2.0, 1.0);
        let c = career(10000.0, 3000.0, 2000.0, 400.0, 200.0, 30000.0);

        let flat = calc.calculate(Some(&s), Some(&c), 0.0);
        assert!((flat.season_value - 64.0).abs() < 1e-9);
        assert!((flat.career_value - 21.8).abs() < 1e-9);
        assert_eq!(flat.price, Decimal::new(8580, 2));

        let half = calc.calculate(Some(&s), Some(&c), 0.5);
        assert!((half.demand_multiplier - 1.2).abs() < 1e-12);
        assert_eq!(half.price, Decimal::new(10296, 2));
    }

    #[test]
    fn test_career_counts_without_season_gate() {
        let calc = ValueCalculator::default();
        let s = season(3, 40.0, 10.0, 10.0, 3.0, 3.0);
        let c = career(30000.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        let breakdown = calc.calculate(Some(&s), Some(&c), 0.0);
        assert_eq!(breakdown.season_value, 0.0);
        assert_eq!(breakdown.price, Decimal::from(30));
    }

    #[test]
    fn test_missing_stats_hit_floor() {
        let calc = ValueCalculator::default();
        let breakdown = calc.calculate(None, None, 1.0);
        assert_eq!(breakdown.value, 10.0);
        assert_eq!(breakdown.price, Decimal::from(10));
    }

    proptest! {
        #[test]
        fn prop_smoothstep_bounded(x in 0.0f64..=1.0) {
            let y = smoothstep(x);
            prop_assert!((0.0..=1.0).contains(&y));
        }

        #[test]
        fn prop_smoothstep_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(smoothstep(lo) <= smoothstep(hi));
        }

        #[test]
        fn prop_value_never_below_floor(
            games in 0i32..90,
            ppg in 0.0f64..60.0,
            apg in 0.0f64..20.0,
            rpg in 0.0f64..20.0,
            points in 0.0f64..50000.0,
            demand in -1.0f64..2.0,
        ) {
            let calc = ValueCalculator::default();
            let s = season(games, ppg, apg, rpg, 0.0, 0.0);
            let c = career(points, 0.0, 0.0, 0.0, 0.0, 0.0);
            let breakdown = calc.calculate(Some(&s), Some(&c), demand);
            prop_assert!(breakdown.value >= 10.0);
            prop_assert!(breakdown.price >= Decimal::from(10));
        }
    }
}
