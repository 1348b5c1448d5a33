//! Text summaries printed after each command.

use qs_02_group_orchestrator::{
    BookingReceipt, Identity, PoolSummary, Receipt, StatusReport, WithdrawalReceipt,
};
use shared_types::Address;
use std::fmt::Write;

const WIDTH: usize = 72;

/// Titled block of label/value rows.
#[derive(Debug, Default)]
pub struct Summary {
    title: String,
    rows: Vec<(String, String)>,
}

impl Summary {
    /// Empty summary titled `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn row(mut self, label: &str, value: impl ToString) -> Self {
        self.rows.push((label.to_string(), value.to_string()));
        self
    }

    /// Render with a banner header and aligned values.
    pub fn render(&self) -> String {
        let label_width = self
            .rows
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        let title = format!(" {} ", self.title.to_uppercase());
        let fill = WIDTH.saturating_sub(title.chars().count() + 4);
        let left = fill / 2;
        let right = fill - left;

        let mut out = String::new();
        let _ = writeln!(out, "* {}{}{} *", "=".repeat(left), title, "=".repeat(right));
        out.push('\n');
        for (label, value) in &self.rows {
            let _ = writeln!(out, "   {:<width$}  {}", format!("{}:", label), value, width = label_width + 1);
        }
        out.push('\n');
        let _ = writeln!(out, "* {} *", "=".repeat(WIDTH - 4));
        out
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Pool overview.
pub fn pool(summary: &PoolSummary) -> String {
    Summary::new("staking pool summary")
        .row("Pool ID", summary.pool_id)
        .row("Creator", summary.creator)
        .row("Escrow", or_dash(summary.escrow))
        .row("Asset ID", or_dash(summary.asset_id))
        .row("Locking rounds", or_dash(summary.locking_rounds))
        .row("Bookable amount", summary.bookable_amount)
        .row("Escrow balance", or_dash(summary.escrow_balance))
        .row("Current round", summary.current_round)
        .render()
}

/// Participant status.
pub fn status(report: &StatusReport) -> String {
    Summary::new("booked staking summary")
        .row("Pool ID", report.pool_id)
        .row("Account", report.participant)
        .row("Booked amount", report.booking.booked_amount)
        .row("Booking round", report.booking.booking_round)
        .row("Unlock round", or_dash(report.unlock_round))
        .row("Current round", report.current_round)
        .row("Status", report.status)
        .render()
}

/// Committed booking.
pub fn booking(receipt: &BookingReceipt) -> String {
    Summary::new("booking committed")
        .row("Pool ID", receipt.pool_id)
        .row("Amount", receipt.amount)
        .row("Booking round", receipt.round)
        .row("Unlock round", receipt.unlock_round)
        .render()
}

/// Committed withdrawal.
pub fn withdrawal(receipt: &WithdrawalReceipt) -> String {
    Summary::new("withdrawal completed")
        .row("Pool ID", receipt.pool_id)
        .row("Payout", receipt.payout)
        .row("Round", receipt.round)
        .render()
}

/// Any other committed group.
pub fn receipt(title: &str, receipt: &Receipt) -> String {
    let mut summary = Summary::new(title).row("Round", receipt.round);
    if let Some(pool_id) = receipt.created_pool {
        summary = summary.row("Pool ID", pool_id);
    }
    if let Some(asset_id) = receipt.created_asset {
        summary = summary.row("Asset ID", asset_id);
    }
    summary.render()
}

/// Account listing.
pub fn accounts(accounts: &[(Identity, Address)]) -> String {
    accounts
        .iter()
        .fold(Summary::new("accounts"), |summary, (identity, address)| {
            summary.row(&identity.0, address)
        })
        .render()
}
