use std::fmt::Write;
use tally_core::{format_day, TrafficSummary};

pub fn render_summary(summary: &TrafficSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total views:     {}", summary.total.total_views);
    let _ = writeln!(out, "Unique visitors: {}", summary.total.unique_visitors);

    out.push_str("\nDaily\n");
    if summary.daily.is_empty() {
        out.push_str("  (none)\n");
    }
    for day in &summary.daily {
        let _ = writeln!(out, "  {}  {:>8}", format_day(day.day), day.views);
    }

    out.push_str("\nTop pages\n");
    if summary.top_pages.is_empty() {
        out.push_str("  (none)\n");
    }
    let width = summary
        .top_pages
        .iter()
        .map(|page| page.path.chars().count())
        .max()
        .unwrap_or(0);
    for page in &summary.top_pages {
        let _ = writeln!(out, "  {:<width$}  {:>8}", page.path, page.views);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{DailyViews, PageViews};

    #[test]
    fn renders_totals_days_and_pages() {
        let summary = TrafficSummary::from_counts(
            vec![
                PageViews {
                    path: "/menu".to_string(),
                    views: 3,
                },
                PageViews {
                    path: "/".to_string(),
                    views: 1,
                },
            ],
            vec![DailyViews {
                day: NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"),
                views: 4,
            }],
            2,
        );
        let text = render_summary(&summary);
        assert!(text.contains("Total views:     4"));
        assert!(text.contains("Unique visitors: 2"));
        assert!(text.contains("2026-10-19"));
        let menu = text.find("/menu").expect("menu row");
        let root = text.find("  /  ").expect("root row");
        assert!(menu < root);
    }

    #[test]
    fn empty_summary_says_none() {
        let text = render_summary(&TrafficSummary::default());
        assert_eq!(text.matches("(none)").count(), 2);
    }
}
