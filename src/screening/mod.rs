use crate::config::RiskConstraints;
use crate::models::SymbolSnapshot;

/// Pre-market screen: keep only symbols whose 3-day institutional net
/// flow clears the threshold for their market-cap tier
pub struct InstitutionalScreener {
    constraints: RiskConstraints,
}

impl InstitutionalScreener {
    pub fn new(constraints: RiskConstraints) -> Self {
        Self { constraints }
    }

    pub fn passes(&self, snapshot: &SymbolSnapshot) -> bool {
        let tier = self.constraints.cap_tier(&snapshot.symbol);
        snapshot.flows.net_3day >= self.constraints.cap_threshold(tier)
    }

    /// Filter a universe down to the screened shortlist
    pub fn screen(&self, snapshots: Vec<SymbolSnapshot>) -> Vec<SymbolSnapshot> {
        let before = snapshots.len();
        let shortlist: Vec<SymbolSnapshot> =
            snapshots.into_iter().filter(|s| self.passes(s)).collect();
        tracing::info!(
            screened = shortlist.len(),
            universe = before,
            "institutional screening complete"
        );
        shortlist
    }
}
