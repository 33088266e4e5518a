//! Net-new-money factoring.
//!
//! Money an organisation received and then passes on is not new money. The
//! factors scale outgoing commitments and spending down by the share already
//! covered by incoming funds or commitments.

use iati_core::TransactionClass;

/// USD totals of the four transaction classes across one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassTotals {
    pub incoming_funds: f64,
    pub incoming_commitments: f64,
    pub outgoing_commitments: f64,
    pub spending: f64,
}

impl ClassTotals {
    /// Add a USD value to the total of its class.
    pub fn add(&mut self, class: TransactionClass, value: f64) {
        match class {
            TransactionClass::IncomingFunds => self.incoming_funds += value,
            TransactionClass::IncomingCommitments => self.incoming_commitments += value,
            TransactionClass::OutgoingCommitments => self.outgoing_commitments += value,
            TransactionClass::Spending => self.spending += value,
        }
    }

    /// Total incoming money: the larger of funds and commitments, never below zero.
    pub fn incoming(&self) -> f64 {
        self.incoming_commitments.max(self.incoming_funds).max(0.0)
    }
}

/// Multipliers turning outgoing values into net new money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetMoneyFactors {
    /// Applied to outgoing commitments.
    pub commitment_factor: f64,
    /// Applied to outgoing disbursements and expenditure.
    pub spending_factor: f64,
}

impl Default for NetMoneyFactors {
    fn default() -> Self {
        Self {
            commitment_factor: 1.0,
            spending_factor: 1.0,
        }
    }
}

impl NetMoneyFactors {
    /// Derive the factors from activity totals.
    ///
    /// With no incoming money everything outgoing is new (both factors 1.0).
    pub fn from_totals(totals: &ClassTotals) -> Self {
        let incoming = totals.incoming();
        if incoming == 0.0 {
            return Self::default();
        }
        Self {
            commitment_factor: net_share(totals.outgoing_commitments, incoming),
            spending_factor: net_share(totals.spending, incoming),
        }
    }
}

/// Share of `outgoing` exceeding `incoming`; 0.0 when there is no excess.
fn net_share(outgoing: f64, incoming: f64) -> f64 {
    if outgoing > incoming && outgoing > 0.0 {
        (outgoing - incoming) / outgoing
    } else {
        0.0
    }
}
