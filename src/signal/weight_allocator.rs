use crate::models::{PositionAllocation, TrendType};

/// Per-trend risk profile: base capital weight and stop-loss multiplier
#[derive(Debug, Clone, Copy)]
struct RiskProfile {
    base_weight: f64,
    sl_multiplier: f64,
}

/// Maps a trend classification and composite score to a position weight.
///
/// The trend table is closed over `TrendType`; unknown trend labels are
/// rejected upstream when parsing (`TrendType::from_str`), never silently
/// defaulted here.
pub struct WeightAllocator;

impl WeightAllocator {
    fn profile(trend: TrendType) -> RiskProfile {
        match trend {
            TrendType::Uptrend => RiskProfile {
                base_weight: 0.7,
                sl_multiplier: 1.5,
            },
            TrendType::Downtrend => RiskProfile {
                base_weight: 0.4,
                sl_multiplier: 1.2,
            },
            TrendType::Consolidation => RiskProfile {
                base_weight: 0.5,
                sl_multiplier: 1.3,
            },
        }
    }

    /// Weight = base_weight x composite_score, clamped to [0, 1]. The
    /// clamp is mandatory: composites above 1/base_weight occur whenever
    /// several strategies agree.
    pub fn allocate(
        symbol: &str,
        trend: TrendType,
        composite_score: f64,
    ) -> PositionAllocation {
        let profile = Self::profile(trend);
        let weight = (profile.base_weight * composite_score).clamp(0.0, 1.0);

        PositionAllocation {
            symbol: symbol.to_string(),
            weight,
            trend,
            sl_multiplier: profile.sl_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptrend_profile() {
        let alloc = WeightAllocator::allocate("RELIANCE", TrendType::Uptrend, 1.0);
        assert_eq!(alloc.weight, 0.7);
        assert_eq!(alloc.sl_multiplier, 1.5);
        assert_eq!(alloc.trend, TrendType::Uptrend);
    }

    #[test]
    fn test_downtrend_and_consolidation_profiles() {
        let down = WeightAllocator::allocate("X", TrendType::Downtrend, 1.0);
        assert_eq!(down.weight, 0.4);
        assert_eq!(down.sl_multiplier, 1.2);

        let flat = WeightAllocator::allocate("X", TrendType::Consolidation, 1.0);
        assert_eq!(flat.weight, 0.5);
        assert_eq!(flat.sl_multiplier, 1.3);
    }

    #[test]
    fn test_weight_clamped_to_one() {
        // Composite scores routinely exceed 1/base_weight
        let alloc = WeightAllocator::allocate("RELIANCE", TrendType::Uptrend, 8.2);
        assert_eq!(alloc.weight, 1.0);
    }

    #[test]
    fn test_weight_floor_at_zero() {
        let alloc = WeightAllocator::allocate("RELIANCE", TrendType::Downtrend, -2.0);
        assert_eq!(alloc.weight, 0.0);
    }
}
