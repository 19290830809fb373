use super::{Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::models::{Direction, Signal, SignalReason, SymbolSnapshot};

/// Delivery-volume analysis: high delivery percentage sustained over three
/// days marks genuine accumulation; low delivery marks churn.
pub struct DeliveryAnalysisStrategy;

impl Strategy for DeliveryAnalysisStrategy {
    fn name(&self) -> &'static str {
        "delivery_analysis"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Institutional
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let flows = &snapshot.flows;

        if flows.delivery_pct > 40.0 && flows.delivery_3day_avg > 1.5 {
            let Some(close) = snapshot.last_close() else {
                return Ok(None);
            };
            if close <= 0.0 {
                return Ok(None);
            }

            let signal = Signal::tradeable(
                8.0,
                SignalReason::HighDeliveryVolume,
                Direction::Long,
                close,
                close * 0.97,
                close * 1.06,
                2,
            )
            .map_err(|e| StrategyError::MalformedInput {
                strategy: "delivery_analysis",
                detail: e.to_string(),
            })?;

            return Ok(Some(signal));
        }

        // delivery_pct of exactly zero is the missing-data default, not a
        // published reading; it must not count as low delivery
        if flows.delivery_pct < 25.0 && flows.delivery_pct > 0.0 {
            return Ok(Some(Signal::advisory(
                3.0,
                SignalReason::LowDeliveryVolume,
                1,
            )));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Candle;

    fn snapshot(delivery_pct: f64, delivery_3day_avg: f64, close: f64) -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("PEL");
        snap.flows.delivery_pct = delivery_pct;
        snap.flows.delivery_3day_avg = delivery_3day_avg;
        snap.candles.push(Candle {
            symbol: "PEL".to_string(),
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1e6,
        });
        snap
    }

    #[test]
    fn test_high_delivery_signal() {
        let snap = snapshot(45.0, 1.8, 100.0);
        let signal = DeliveryAnalysisStrategy.analyze(&snap).unwrap().unwrap();

        assert_eq!(signal.score, 8.0);
        assert_eq!(signal.reason, SignalReason::HighDeliveryVolume);
        assert_eq!(signal.validity_days, 2);

        let levels = signal.levels.unwrap();
        assert_eq!(levels.entry, 100.0);
        assert_eq!(levels.sl, 97.0);
        assert_eq!(levels.target, 106.0);
    }

    #[test]
    fn test_low_delivery_advisory() {
        let snap = snapshot(20.0, 1.0, 100.0);
        let signal = DeliveryAnalysisStrategy.analyze(&snap).unwrap().unwrap();

        assert_eq!(signal.score, 3.0);
        assert_eq!(signal.reason, SignalReason::LowDeliveryVolume);
        assert!(signal.levels.is_none());
    }

    #[test]
    fn test_middling_delivery_abstains() {
        let snap = snapshot(32.0, 1.2, 100.0);
        assert!(DeliveryAnalysisStrategy.analyze(&snap).unwrap().is_none());
    }

    #[test]
    fn test_absent_delivery_data_is_not_low_delivery() {
        let snap = snapshot(0.0, 0.0, 100.0);
        assert!(DeliveryAnalysisStrategy.analyze(&snap).unwrap().is_none());
    }

    #[test]
    fn test_high_delivery_without_bars_abstains() {
        let mut snap = SymbolSnapshot::new("PEL");
        snap.flows.delivery_pct = 45.0;
        snap.flows.delivery_3day_avg = 1.8;
        assert!(DeliveryAnalysisStrategy.analyze(&snap).unwrap().is_none());
    }
}
