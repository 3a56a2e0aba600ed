use std::collections::BTreeMap;

use crate::state::WalletStats;

/// Which counter a leaderboard ranks by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatMetric {
    Tickets,
    Wins,
    Xp,
}

impl StatMetric {
    fn value(&self, stats: &WalletStats) -> u64 {
        match self {
            StatMetric::Tickets => stats.tickets,
            StatMetric::Wins => stats.wins,
            StatMetric::Xp => stats.xp,
        }
    }
}

/// Top `n` wallets by the given metric, zero rows dropped. Ties break on the
/// wallet address so the ordering is stable across runs.
pub fn top_n(
    stats: &BTreeMap<String, WalletStats>,
    metric: StatMetric,
    n: usize,
) -> Vec<(String, WalletStats)> {
    let mut rows: Vec<(String, WalletStats)> = stats
        .iter()
        .filter(|(_, s)| metric.value(s) > 0)
        .map(|(w, s)| (w.clone(), *s))
        .collect();
    rows.sort_by(|a, b| metric.value(&b.1).cmp(&metric.value(&a.1)).then(a.0.cmp(&b.0)));
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(tickets: u64, wins: u64, xp: u64) -> WalletStats {
        WalletStats { tickets, wins, xp }
    }

    #[test]
    fn ranks_by_metric_and_drops_zero_rows() {
        let mut map = BTreeMap::new();
        map.insert("0xaa".to_string(), stats(5, 0, 10));
        map.insert("0xbb".to_string(), stats(9, 1, 0));
        map.insert("0xcc".to_string(), stats(0, 0, 3));

        let by_tickets = top_n(&map, StatMetric::Tickets, 10);
        assert_eq!(by_tickets[0].0, "0xbb");
        assert_eq!(by_tickets[1].0, "0xaa");
        assert_eq!(by_tickets.len(), 2);

        let by_xp = top_n(&map, StatMetric::Xp, 1);
        assert_eq!(by_xp, vec![("0xaa".to_string(), stats(5, 0, 10))]);
    }

    #[test]
    fn ties_break_on_wallet_address() {
        let mut map = BTreeMap::new();
        map.insert("0xbb".to_string(), stats(4, 0, 0));
        map.insert("0xaa".to_string(), stats(4, 0, 0));

        let rows = top_n(&map, StatMetric::Tickets, 10);
        assert_eq!(rows[0].0, "0xaa");
        assert_eq!(rows[1].0, "0xbb");
    }
}
