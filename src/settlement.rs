// ⚖️ Settlement Calculator - who owes whom
//
// Everyone shares the pool evenly:
//   equal_share = total / participants
//   balance(p)  = contribution(p) - equal_share
//
// Balances always sum to zero. Each debtor's debt is then spread across all
// creditors in proportion to what each creditor is due, so a settlement can
// contain up to |debtors| x |creditors| transfers.

use crate::error::{Result, SplitBillError};
use crate::expense::ExpenseRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances within this distance of zero are settled
pub const TOLERANCE: f64 = 1e-6;

/// participant -> signed net amount (positive = receives, negative = owes)
pub type Balances = BTreeMap<String, f64>;

// ============================================================================
// TRANSFER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub payer: String,
    pub receiver: String,
    pub amount: f64,
}

impl Transfer {
    pub fn describe(&self) -> String {
        format!("{} will pay {:.2} to {}", self.payer, self.amount, self.receiver)
    }
}

// ============================================================================
// PARTICIPANT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Should receive this much
    Receives(f64),
    /// Owes this much (positive number)
    Owes(f64),
    Settled,
}

impl ParticipantStatus {
    pub fn from_balance(balance: f64) -> Self {
        if balance > TOLERANCE {
            ParticipantStatus::Receives(balance)
        } else if balance < -TOLERANCE {
            ParticipantStatus::Owes(-balance)
        } else {
            ParticipantStatus::Settled
        }
    }

    pub fn describe(&self, participant: &str) -> String {
        match self {
            ParticipantStatus::Receives(amount) => {
                format!("{} should receive: {:.2}", participant, amount)
            }
            ParticipantStatus::Owes(amount) => format!("{} owes: {:.2}", participant, amount),
            ParticipantStatus::Settled => format!("{} is settled.", participant),
        }
    }
}

// ============================================================================
// CORE COMPUTATION
// ============================================================================

/// Sum of amounts per participant, ordered by participant name
pub fn contributions(records: &[ExpenseRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.participant.clone()).or_insert(0.0) += record.amount;
    }
    totals
}

/// Net balance per participant.
///
/// Only participants with at least one record take part. Fails with
/// `EmptyInput` when there is nothing to split.
pub fn compute_balances(records: &[ExpenseRecord]) -> Result<Balances> {
    if let Some(bad) = records
        .iter()
        .find(|r| !r.amount.is_finite() || r.amount < 0.0)
    {
        return Err(SplitBillError::invalid(
            "amount",
            format!("expense {} has amount {}", bad.id, bad.amount),
        ));
    }

    let per_participant = contributions(records);
    if per_participant.is_empty() {
        return Err(SplitBillError::EmptyInput);
    }

    let total: f64 = records.iter().map(|r| r.amount).sum();
    let equal_share = total / per_participant.len() as f64;

    Ok(per_participant
        .into_iter()
        .map(|(participant, contribution)| (participant, contribution - equal_share))
        .collect())
}

/// Transfers that zero out `balances`, grouped by payer.
pub fn compute_transfers(balances: &Balances) -> Vec<Transfer> {
    let debtors: Vec<(&String, f64)> = balances
        .iter()
        .filter(|(_, b)| **b < -TOLERANCE)
        .map(|(p, b)| (p, *b))
        .collect();
    let creditors: Vec<(&String, f64)> = balances
        .iter()
        .filter(|(_, b)| **b > TOLERANCE)
        .map(|(p, b)| (p, *b))
        .collect();

    let total_due: f64 = creditors.iter().map(|(_, b)| b).sum();
    if total_due.abs() <= TOLERANCE {
        return Vec::new();
    }

    let mut transfers = Vec::with_capacity(debtors.len() * creditors.len());
    for (payer, debt) in &debtors {
        let owed = -debt;
        for (receiver, due) in &creditors {
            transfers.push(Transfer {
                payer: (*payer).clone(),
                receiver: (*receiver).clone(),
                amount: (due / total_due) * owed,
            });
        }
    }

    transfers
}

/// Net amount a participant ends up with after the transfers
/// (received minus paid).
pub fn net_received(transfers: &[Transfer], participant: &str) -> f64 {
    transfers.iter().fold(0.0, |acc, t| {
        if t.receiver == participant {
            acc + t.amount
        } else if t.payer == participant {
            acc - t.amount
        } else {
            acc
        }
    })
}

// ============================================================================
// SETTLEMENT REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantLine {
    pub participant: String,
    pub contribution: f64,
    pub balance: f64,
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub total: f64,
    pub participant_count: usize,
    pub equal_share: f64,
    pub participants: Vec<ParticipantLine>,
    pub transfers: Vec<Transfer>,
}

impl SettlementReport {
    pub fn balances(&self) -> Balances {
        self.participants
            .iter()
            .map(|line| (line.participant.clone(), line.balance))
            .collect()
    }

    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total {:.2} across {} participants, equal share {:.2}, {} transfers",
            self.total,
            self.participant_count,
            self.equal_share,
            self.transfers.len()
        )
    }
}

/// Full settlement for a snapshot of records
pub fn settle(records: &[ExpenseRecord]) -> Result<SettlementReport> {
    let balances = compute_balances(records)?;
    let per_participant = contributions(records);
    let total: f64 = per_participant.values().sum();
    let participant_count = per_participant.len();
    let transfers = compute_transfers(&balances);

    let participants = per_participant
        .into_iter()
        .map(|(participant, contribution)| {
            let balance = balances.get(&participant).copied().unwrap_or(0.0);
            ParticipantLine {
                participant,
                contribution,
                balance,
                status: ParticipantStatus::from_balance(balance),
            }
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        participants = participant_count,
        transfers = transfers.len(),
        "computed settlement"
    );

    Ok(SettlementReport {
        total,
        participant_count,
        equal_share: total / participant_count as f64,
        participants,
        transfers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(entries: &[(&str, f64)]) -> Vec<ExpenseRecord> {
        entries
            .iter()
            .map(|(p, a)| ExpenseRecord::new(p, *a, "test"))
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn find<'a>(transfers: &'a [Transfer], payer: &str, receiver: &str) -> &'a Transfer {
        transfers
            .iter()
            .find(|t| t.payer == payer && t.receiver == receiver)
            .unwrap_or_else(|| panic!("no transfer {} -> {}", payer, receiver))
    }

    #[test]
    fn test_empty_input() {
        let result = compute_balances(&[]);
        assert!(matches!(result, Err(SplitBillError::EmptyInput)));
        assert!(settle(&[]).unwrap_err().is_empty_input());
    }

    #[test]
    fn test_negative_amount_rejected() {
        for bad in [-5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = compute_balances(&records(&[("A", 10.0), ("B", bad)]));
            match result {
                Err(SplitBillError::InvalidRecord { field, .. }) => assert_eq!(field, "amount"),
                other => panic!("expected amount error for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_single_participant_is_settled() {
        let recs = records(&[("Kunal", 120.0), ("Kunal", 80.0), ("Kunal", 0.5)]);
        let balances = compute_balances(&recs).unwrap();

        assert_eq!(balances.len(), 1);
        assert_close(balances["Kunal"], 0.0);
        assert!(compute_transfers(&balances).is_empty());
    }

    #[test]
    fn test_one_payer_two_debtors() {
        let recs = records(&[("Kunal", 300.0), ("Himanshu", 0.0), ("Aakash", 0.0)]);
        let balances = compute_balances(&recs).unwrap();

        assert_close(balances["Kunal"], 200.0);
        assert_close(balances["Himanshu"], -100.0);
        assert_close(balances["Aakash"], -100.0);

        let transfers = compute_transfers(&balances);
        assert_eq!(transfers.len(), 2);
        assert_close(find(&transfers, "Himanshu", "Kunal").amount, 100.0);
        assert_close(find(&transfers, "Aakash", "Kunal").amount, 100.0);
    }

    #[test]
    fn test_cross_product_scenario() {
        let recs = records(&[("A", 90.0), ("B", 30.0), ("C", 0.0)]);
        let balances = compute_balances(&recs).unwrap();

        assert_close(balances["A"], 50.0);
        assert_close(balances["B"], -10.0);
        assert_close(balances["C"], -40.0);

        let transfers = compute_transfers(&balances);
        assert_eq!(transfers.len(), 2);
        assert_close(find(&transfers, "B", "A").amount, 10.0);
        assert_close(find(&transfers, "C", "A").amount, 40.0);
    }

    #[test]
    fn test_proportional_allocation_across_creditors() {
        // share = 60: A +60, B +30, C -30, D -60
        let recs = records(&[("A", 120.0), ("B", 90.0), ("C", 30.0), ("D", 0.0)]);
        let balances = compute_balances(&recs).unwrap();
        let transfers = compute_transfers(&balances);

        // Full cross product: 2 debtors x 2 creditors
        assert_eq!(transfers.len(), 4);
        assert_close(find(&transfers, "C", "A").amount, 20.0);
        assert_close(find(&transfers, "C", "B").amount, 10.0);
        assert_close(find(&transfers, "D", "A").amount, 40.0);
        assert_close(find(&transfers, "D", "B").amount, 20.0);

        for (participant, balance) in &balances {
            assert_close(net_received(&transfers, participant), *balance);
        }
    }

    #[test]
    fn test_transfers_grouped_by_payer() {
        let recs = records(&[("A", 120.0), ("B", 90.0), ("C", 30.0), ("D", 0.0)]);
        let transfers = compute_transfers(&compute_balances(&recs).unwrap());
        let payers: Vec<&str> = transfers.iter().map(|t| t.payer.as_str()).collect();

        assert_eq!(payers, vec!["C", "C", "D", "D"]);
    }

    #[test]
    fn test_near_zero_balances_are_settled() {
        let mut balances = Balances::new();
        balances.insert("A".to_string(), 1e-9);
        balances.insert("B".to_string(), -1e-9);

        assert!(compute_transfers(&balances).is_empty());
        assert_eq!(ParticipantStatus::from_balance(1e-9), ParticipantStatus::Settled);
    }

    #[test]
    fn test_zero_sum_with_awkward_amounts() {
        let recs = records(&[("A", 10.0), ("B", 0.01), ("C", 33.33), ("A", 7.77)]);
        let balances = compute_balances(&recs).unwrap();
        let sum: f64 = balances.values().sum();

        assert!(sum.abs() < TOLERANCE, "balances sum to {}", sum);
    }

    #[test]
    fn test_compute_balances_is_idempotent() {
        let recs = records(&[("A", 12.5), ("B", 7.25), ("C", 3.0)]);
        assert_eq!(compute_balances(&recs).unwrap(), compute_balances(&recs).unwrap());
    }

    #[test]
    fn test_settle_report() {
        let recs = records(&[("Kunal", 200.0), ("Kunal", 100.0), ("Himanshu", 0.0), ("Aakash", 0.0)]);
        let report = settle(&recs).unwrap();

        assert_close(report.total, 300.0);
        assert_eq!(report.participant_count, 3);
        assert_close(report.equal_share, 100.0);
        assert_eq!(report.transfers.len(), 2);
        assert!(!report.is_settled());

        let kunal = report
            .participants
            .iter()
            .find(|l| l.participant == "Kunal")
            .unwrap();
        assert_close(kunal.contribution, 300.0);
        assert!(matches!(kunal.status, ParticipantStatus::Receives(_)));
        assert_eq!(kunal.status.describe("Kunal"), "Kunal should receive: 200.00");
        assert_eq!(report.balances().len(), 3);
        assert_eq!(
            report.summary(),
            "Total 300.00 across 3 participants, equal share 100.00, 2 transfers"
        );
    }

    #[test]
    fn test_status_descriptions() {
        assert_eq!(ParticipantStatus::from_balance(-40.0).describe("C"), "C owes: 40.00");
        assert_eq!(ParticipantStatus::Settled.describe("B"), "B is settled.");

        let transfer = Transfer {
            payer: "C".to_string(),
            receiver: "A".to_string(),
            amount: 40.0,
        };
        assert_eq!(transfer.describe(), "C will pay 40.00 to A");
    }
}
