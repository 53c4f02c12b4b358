//! Human-readable HTML pages

use crate::api::server::AppState;
use crate::types::{Outcome, RoundResult};
use axum::{extract::State, response::Html};
use std::fmt::Write;

const HISTORY_STYLE: &str = "<style>\
body{font-family:monospace;background-color:#121212;color:#e0e0e0;}\
.entry{border-bottom:1px solid #444;padding:5px;}\
.high{color:#28a745;}.low{color:#dc3545;}\
.hit{color:#28a745;}.miss{color:#dc3545;}.none{color:#888;}\
</style>";

/// Landing page linking the other endpoints
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let capacity = state.engine.read().await.capacity();
    Html(format!(
        "<h2>Dice Round Predictor</h2>\
         <p>Current status (JSON): <a href=\"/status\">/status</a></p>\
         <p>Last {} rounds: <a href=\"/history\">/history</a></p>\
         <p>History (JSON): <a href=\"/api/history\">/api/history</a></p>\
         <p>Metrics (JSON): <a href=\"/api/metrics\">/api/metrics</a></p>",
        capacity
    ))
}

/// Round history, most recent first
pub async fn history_page(State(state): State<AppState>) -> Html<String> {
    let engine = state.engine.read().await;
    Html(render_history(engine.history().rev(), engine.len()))
}

fn render_history<'a>(rounds: impl Iterator<Item = &'a RoundResult>, count: usize) -> String {
    let mut html = String::with_capacity(256 + count * 256);
    html.push_str(HISTORY_STYLE);
    let _ = write!(html, "<h2>Last {} rounds</h2>", count);

    if count == 0 {
        html.push_str("<p>No rounds recorded yet.</p>");
        return html;
    }

    for round in rounds {
        let class = outcome_class(round.outcome);
        let prediction = match round.predicted_outcome {
            Some(p) => format!("<b class=\"{}\">{}</b>", outcome_class(p), p),
            None => "<span class=\"none\">-</span>".to_string(),
        };
        let verdict = match round.was_correct {
            Some(true) => "<span class=\"hit\">correct</span>",
            Some(false) => "<span class=\"miss\">wrong</span>",
            None => "<span class=\"none\">n/a</span>",
        };

        let _ = write!(
            html,
            "<div class=\"entry\">- Round: {}<br/>- Result: <b class=\"{}\">{}</b><br/>\
             - Dice: [{}]-[{}]-[{}]<br/>- Total: {}<br/>- Predicted: {} ({})<br/>\
             - At: {}</div>",
            escape_html(&round.round_label()),
            class,
            round.outcome,
            round.dice[0],
            round.dice[1],
            round.dice[2],
            round.total,
            prediction,
            verdict,
            round.received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    html
}

fn outcome_class(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::High => "high",
        Outcome::Low => "low",
    }
}

/// Round ids come straight from the feed
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoundId;

    #[test]
    fn test_empty_history() {
        let html = render_history(std::iter::empty(), 0);
        assert!(html.contains("No rounds recorded yet."));
    }

    #[test]
    fn test_history_entry_escaped_and_marked() {
        let mut round = RoundResult::new(Some(RoundId::Text("<b>7</b>".to_string())), [6, 6, 6]).unwrap();
        round.predicted_outcome = Some(Outcome::Low);
        round.was_correct = Some(false);

        let html = render_history(std::iter::once(&round), 1);
        assert!(html.contains("&lt;b&gt;7&lt;/b&gt;"));
        assert!(!html.contains("<b>7</b>"));
        assert!(html.contains("[6]-[6]-[6]"));
        assert!(html.contains("- Total: 18"));
        assert!(html.contains("class=\"miss\""));
    }
}
