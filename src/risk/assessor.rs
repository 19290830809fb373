use crate::models::SymbolSnapshot;
use crate::positions::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskAction {
    Hold,
    PartialExit,
    EmergencyExit,
}

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub symbol: String,
    /// 0-10, capped
    pub risk_score: u8,
    pub action: RiskAction,
}

/// Scores deterioration risk for an open position from three independent
/// signals: institutional selling (+3), support break (+4), volume drying
/// up (+2). 7+ demands an emergency exit, 4-6 a partial exit.
#[derive(Debug, Clone)]
pub struct SwingRiskAssessor {
    /// Bars forming the support band under the last close
    pub support_band: usize,
    /// Volume lookback for the drying check
    pub volume_lookback: usize,
    /// Recent-mean under this fraction of the lookback mean counts as dry
    pub drying_factor: f64,
}

impl Default for SwingRiskAssessor {
    fn default() -> Self {
        Self {
            support_band: 10,
            volume_lookback: 20,
            drying_factor: 0.5,
        }
    }
}

impl SwingRiskAssessor {
    pub fn evaluate(&self, position: &Position, snapshot: &SymbolSnapshot) -> RiskAssessment {
        let mut risk_score = 0u8;

        if Self::institutional_selling(snapshot) {
            risk_score += 3;
        }
        if self.support_break(snapshot) {
            risk_score += 4;
        }
        if self.volume_drying(snapshot) {
            risk_score += 2;
        }

        let risk_score = risk_score.min(10);
        RiskAssessment {
            symbol: position.symbol.clone(),
            risk_score,
            action: Self::determine_action(risk_score),
        }
    }

    fn determine_action(score: u8) -> RiskAction {
        if score >= 7 {
            RiskAction::EmergencyExit
        } else if score >= 4 {
            RiskAction::PartialExit
        } else {
            RiskAction::Hold
        }
    }

    /// Negative 3-day institutional net flow
    fn institutional_selling(snapshot: &SymbolSnapshot) -> bool {
        snapshot.flows.net_3day < 0.0
    }

    /// Last close under the low of the preceding support band
    fn support_break(&self, snapshot: &SymbolSnapshot) -> bool {
        let closes = snapshot.closes();
        if closes.len() < self.support_band + 1 {
            return false;
        }
        let band = &closes[closes.len() - 1 - self.support_band..closes.len() - 1];
        let support = band.iter().copied().fold(f64::INFINITY, f64::min);
        closes[closes.len() - 1] < support
    }

    /// Recent 5-bar mean volume below drying_factor x lookback mean
    fn volume_drying(&self, snapshot: &SymbolSnapshot) -> bool {
        let volumes = snapshot.volumes();
        if volumes.len() < self.volume_lookback {
            return false;
        }
        let lookback = &volumes[volumes.len() - self.volume_lookback..];
        let lookback_mean: f64 = lookback.iter().sum::<f64>() / lookback.len() as f64;
        if lookback_mean == 0.0 {
            return false;
        }

        let recent = &volumes[volumes.len() - 5..];
        let recent_mean: f64 = recent.iter().sum::<f64>() / recent.len() as f64;
        recent_mean < self.drying_factor * lookback_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Candle;

    fn snapshot(closes: Vec<f64>, volumes: Vec<f64>) -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("TEST");
        snap.candles = closes
            .iter()
            .zip(volumes.iter())
            .enumerate()
            .map(|(i, (&close, &volume))| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc::now() - chrono::Duration::days((closes.len() - i) as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect();
        snap
    }

    fn position() -> Position {
        Position::new("TEST", 100.0, 10, 95.0, 110.0, "gtt-1")
    }

    #[test]
    fn test_healthy_position_holds() {
        let snap = snapshot(vec![100.0; 30], vec![1000.0; 30]);
        let assessment = SwingRiskAssessor::default().evaluate(&position(), &snap);
        assert_eq!(assessment.risk_score, 0);
        assert_eq!(assessment.action, RiskAction::Hold);
    }

    #[test]
    fn test_support_break_alone_is_partial() {
        let mut closes = vec![100.0; 29];
        closes.push(92.0); // below the 10-bar support of 100
        let snap = snapshot(closes, vec![1000.0; 30]);

        let assessment = SwingRiskAssessor::default().evaluate(&position(), &snap);
        assert_eq!(assessment.risk_score, 4);
        assert_eq!(assessment.action, RiskAction::PartialExit);
    }

    #[test]
    fn test_selling_plus_support_break_is_emergency() {
        let mut closes = vec![100.0; 29];
        closes.push(92.0);
        let mut snap = snapshot(closes, vec![1000.0; 30]);
        snap.flows.net_3day = -5e7;

        let assessment = SwingRiskAssessor::default().evaluate(&position(), &snap);
        assert_eq!(assessment.risk_score, 7);
        assert_eq!(assessment.action, RiskAction::EmergencyExit);
    }

    #[test]
    fn test_all_factors_cap_at_ten() {
        let mut closes = vec![100.0; 29];
        closes.push(92.0);
        let mut volumes = vec![2000.0; 25];
        volumes.extend(vec![100.0; 5]); // recent mean far below lookback mean
        let mut snap = snapshot(closes, volumes);
        snap.flows.net_3day = -5e7;

        let assessment = SwingRiskAssessor::default().evaluate(&position(), &snap);
        assert_eq!(assessment.risk_score, 9);
        assert_eq!(assessment.action, RiskAction::EmergencyExit);
    }

    #[test]
    fn test_volume_drying_alone_holds() {
        let mut volumes = vec![2000.0; 25];
        volumes.extend(vec![100.0; 5]);
        let snap = snapshot(vec![100.0; 30], volumes);

        let assessment = SwingRiskAssessor::default().evaluate(&position(), &snap);
        assert_eq!(assessment.risk_score, 2);
        assert_eq!(assessment.action, RiskAction::Hold);
    }
}
