//! Statement rendering
//!
//! Turns a user's history sequence into a fixed-width plain-text
//! ledger document. Rendering is a pure function of its inputs: the
//! same `(label, history, generated_at)` triple always yields
//! byte-identical output, so a statement can be regenerated at any
//! time from the history index alone.

use crate::types::HistoryRecord;
use chrono::{DateTime, Utc};
use std::fmt::Write;

const RULE: &str =
    "----------------------------------------------------------------------";

/// Render a statement for `label` from `history` (newest first, as
/// returned by [`Ledger::history`]). Rows appear in chronological
/// order; the closing balance equals the newest record's resulting
/// balance, or 0 when the history is empty.
///
/// [`Ledger::history`]: crate::Ledger::history
pub fn render(label: &str, history: &[HistoryRecord], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();

    writeln!(out, "Points statement for: {}", label).expect("write to String");
    writeln!(
        out,
        "Generated at: {} UTC",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
    .expect("write to String");
    writeln!(out, "{}", RULE).expect("write to String");
    writeln!(
        out,
        "{:<10}  {:<8}  {:<20}  {:<6}  {:>8}  {:>8}",
        "DATE", "TIME", "ACTOR", "ACTION", "AMOUNT", "BALANCE"
    )
    .expect("write to String");

    for record in history.iter().rev() {
        let signed = match record.signed_delta() {
            delta if delta >= 0 => format!("+{}", delta),
            delta => delta.to_string(),
        };

        writeln!(
            out,
            "{:<10}  {:<8}  {:<20}  {:<6}  {:>8}  {:>8}",
            record.created_at.format("%Y-%m-%d").to_string(),
            record.created_at.format("%H:%M:%S").to_string(),
            record.action_by_user_id.as_str(),
            record.action.tag(),
            signed,
            record.after_points,
        )
        .expect("write to String");

        if let Some(reason) = &record.reason {
            writeln!(out, "{:<10}  {:<8}  memo: {}", "", "", reason).expect("write to String");
        }
    }

    let closing = history.first().map(|r| r.after_points).unwrap_or(0);
    writeln!(out, "{}", RULE).expect("write to String");
    writeln!(out, "Closing balance: {}", closing).expect("write to String");

    out
}

/// Render with the current time stamped in the header
pub fn render_now(label: &str, history: &[HistoryRecord]) -> String {
    render(label, history, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionType, UserId};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn record(
        seq: u64,
        action: ActionType,
        amount: i64,
        before: i64,
        reason: Option<&str>,
    ) -> HistoryRecord {
        let delta = match action {
            ActionType::Add => amount,
            ActionType::Remove => -amount,
        };
        HistoryRecord {
            id: Uuid::now_v7(),
            seq,
            target_user_id: UserId::new("100"),
            action_by_user_id: UserId::new("200"),
            action,
            amount,
            before_points: before,
            after_points: before + delta,
            reason: reason.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, seq as u32).unwrap(),
        }
    }

    #[test]
    fn test_empty_history_closes_at_zero() {
        let generated = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let out = render("Alice", &[], generated);
        assert!(out.contains("Points statement for: Alice"));
        assert!(out.ends_with("Closing balance: 0\n"));
    }

    #[test]
    fn test_rows_chronological_and_closing_balance() {
        // Newest first, as history() returns it
        let history = vec![
            record(2, ActionType::Remove, 20, 50, None),
            record(1, ActionType::Add, 50, 0, Some("bonus")),
        ];
        let generated = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let out = render("Alice", &history, generated);

        let add_pos = out.find("+50").unwrap();
        let remove_pos = out.find("-20").unwrap();
        assert!(add_pos < remove_pos, "rows must be chronological");
        assert!(out.contains("memo: bonus"));
        assert!(out.ends_with("Closing balance: 30\n"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let history = vec![record(1, ActionType::Add, 50, 0, Some("bonus"))];
        let generated = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();

        let a = render("Alice", &history, generated);
        let b = render("Alice", &history, generated);
        assert_eq!(a, b);
    }

    #[test]
    fn test_only_generated_line_varies() {
        let history = vec![record(1, ActionType::Add, 50, 0, None)];
        let t1 = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 2, 10, 30, 0).unwrap();

        let a = render("Alice", &history, t1);
        let b = render("Alice", &history, t2);

        let differing: Vec<(&str, &str)> = a
            .lines()
            .zip(b.lines())
            .filter(|(la, lb)| la != lb)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with("Generated at:"));
    }
}
