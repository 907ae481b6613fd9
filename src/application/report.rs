//! Report builder: pure aggregation of a day's persisted decisions and their
//! evidence into the daily narrative.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::entities::daily_report::DailyReport;
use crate::domain::entities::decision::Decision;
use crate::domain::entities::scored_signal::ScoredSignal;
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::verdict::Verdict;

const EVIDENCE_CHARS: usize = 140;

/// Thesis values the reasoning service emits when it has nothing to say.
const PLACEHOLDERS: &[&str] = &[
    "", "-", "--", "...", "n/a", "na", "none", "null", "tbd", "todo", "placeholder", "thesis",
    "thesis_summary", "string", "없음", "미정", "해당 없음",
];

pub fn is_placeholder(text: &str) -> bool {
    let t = text.trim().trim_matches(|c: char| c == '.' || c == '"').to_lowercase();
    PLACEHOLDERS.contains(&t.as_str()) || text.trim().chars().all(|c| !c.is_alphanumeric())
}

/// Top `n` items by frequency, ties broken alphabetically. Items are compared
/// case-insensitively after trimming.
pub fn top_keywords<'a>(items: impl IntoIterator<Item = &'a str>, n: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        let key = item.trim().to_lowercase();
        if !key.is_empty() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)));
    ranked.into_iter().take(n).map(|(k, _)| k).collect()
}

/// Newest decision per symbol, in first-decided order.
pub fn latest_per_symbol(decisions: Vec<Decision>) -> Vec<Decision> {
    let mut order: Vec<String> = Vec::new();
    let mut newest: HashMap<String, Decision> = HashMap::new();
    for d in decisions {
        match newest.get(&d.symbol).map(|kept| d.created_at >= kept.created_at) {
            Some(false) => {}
            Some(true) => {
                newest.insert(d.symbol.clone(), d);
            }
            None => {
                order.push(d.symbol.clone());
                newest.insert(d.symbol.clone(), d);
            }
        }
    }
    order.into_iter().filter_map(|s| newest.remove(&s)).collect()
}

/// Risk notes and red flags of one decision, each counted once. The safety
/// gate writes its reasons into both lists.
fn distinct_risks(d: &Decision) -> Vec<&str> {
    let mut seen = HashSet::new();
    d.risk_notes
        .iter()
        .chain(d.red_flags.iter())
        .map(String::as_str)
        .filter(|r| seen.insert(r.trim().to_lowercase()))
        .collect()
}

pub struct ReportBuilder {
    top_n: usize,
    evidence_per_decision: usize,
}

impl ReportBuilder {
    pub fn new(top_n: usize, evidence_per_decision: usize) -> Self {
        Self {
            top_n,
            evidence_per_decision,
        }
    }

    pub fn build(
        &self,
        scope: MarketScope,
        report_date: NaiveDate,
        decisions: &[Decision],
        scored: &[ScoredSignal],
        now: DateTime<Utc>,
    ) -> DailyReport {
        let by_confidence = |verdict: Verdict| {
            let mut picked: Vec<&Decision> =
                decisions.iter().filter(|d| d.verdict == verdict).collect();
            picked.sort_by(|a, b| {
                b.confidence
                    .value()
                    .total_cmp(&a.confidence.value())
                    .then_with(|| a.symbol.cmp(&b.symbol))
            });
            picked
        };
        let buy_now = by_confidence(Verdict::BuyNow);
        let watch = by_confidence(Verdict::Watch);
        let avoid = by_confidence(Verdict::Avoid);

        let themes = top_keywords(
            decisions.iter().flat_map(|d| d.catalysts.iter().map(String::as_str)),
            self.top_n,
        );
        let risks = top_keywords(decisions.iter().flat_map(distinct_risks), self.top_n);
        let flagged: Vec<&Decision> = decisions
            .iter()
            .filter(|d| is_placeholder(&d.thesis_summary))
            .collect();

        let scored_by_id: HashMap<&str, &ScoredSignal> =
            scored.iter().map(|s| (s.id.as_str(), s)).collect();

        let summary_markdown = self.render(
            scope,
            report_date,
            decisions,
            [&buy_now, &watch, &avoid],
            &themes,
            &risks,
            &flagged,
            &scored_by_id,
        );

        DailyReport {
            id: uuid::Uuid::new_v4().to_string(),
            report_date,
            market_scope: scope,
            summary_markdown,
            top_buy_now: buy_now.iter().take(self.top_n).map(|d| d.id.clone()).collect(),
            top_watch: watch.iter().take(self.top_n).map(|d| d.id.clone()).collect(),
            themes,
            risks,
            flagged_decisions: flagged.iter().map(|d| d.id.clone()).collect(),
            created_at: now,
        }
    }

    /// Up to `evidence_per_decision` highest-scoring signals behind a decision.
    pub fn evidence<'a>(
        &self,
        decision: &Decision,
        scored_by_id: &HashMap<&str, &'a ScoredSignal>,
    ) -> Vec<&'a ScoredSignal> {
        let mut found: Vec<&ScoredSignal> = decision
            .sources_used
            .iter()
            .filter_map(|id| scored_by_id.get(id.as_str()).copied())
            .collect();
        found.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        found.truncate(self.evidence_per_decision);
        found
    }

    #[allow(clippy::too_many_arguments)]
    fn render(
        &self,
        scope: MarketScope,
        date: NaiveDate,
        all: &[Decision],
        buckets: [&Vec<&Decision>; 3],
        themes: &[String],
        risks: &[String],
        flagged: &[&Decision],
        scored_by_id: &HashMap<&str, &ScoredSignal>,
    ) -> String {
        let labels = Labels::for_scope(scope);
        let mut md = String::new();
        let _ = writeln!(md, "# {} {} ({})", labels.title, date, scope.as_str().to_uppercase());

        let avg = if all.is_empty() {
            0.0
        } else {
            all.iter().map(|d| d.confidence.value()).sum::<f64>() / all.len() as f64
        };
        let _ = writeln!(
            md,
            "\n{}: {} · BUY_NOW {} · WATCH {} · AVOID {} · {} {:.2}",
            labels.decisions,
            all.len(),
            buckets[0].len(),
            buckets[1].len(),
            buckets[2].len(),
            labels.avg_confidence,
            avg
        );

        for (verdict, bucket) in [Verdict::BuyNow, Verdict::Watch, Verdict::Avoid]
            .into_iter()
            .zip(buckets)
        {
            if bucket.is_empty() {
                continue;
            }
            let _ = writeln!(md, "\n## {verdict}");
            for d in bucket.iter() {
                let _ = writeln!(
                    md,
                    "\n### {} ({:.2}, {})\n{}",
                    d.symbol, d.confidence.value(), d.time_horizon, d.thesis_summary
                );
                if !d.entry_trigger.is_empty() {
                    let _ = writeln!(md, "- {}: {}", labels.entry, d.entry_trigger);
                }
                if !d.invalidation.is_empty() {
                    let _ = writeln!(md, "- {}: {}", labels.invalidation, d.invalidation);
                }
                for s in self.evidence(d, scored_by_id) {
                    let excerpt: String = s.excerpt.chars().take(EVIDENCE_CHARS).collect();
                    let _ = writeln!(
                        md,
                        "  - [{} {:.2}] {}",
                        s.source,
                        s.final_score,
                        excerpt.replace('\n', " ")
                    );
                }
            }
        }

        if !themes.is_empty() {
            let _ = writeln!(md, "\n## {}\n{}", labels.themes, bullet_list(themes));
        }
        if !risks.is_empty() {
            let _ = writeln!(md, "\n## {}\n{}", labels.risks, bullet_list(risks));
        }
        if !flagged.is_empty() {
            let symbols: Vec<&str> = flagged.iter().map(|d| d.symbol.as_str()).collect();
            let _ = writeln!(md, "\n> {}: {}", labels.flagged, symbols.join(", "));
        }
        md
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

struct Labels {
    title: &'static str,
    decisions: &'static str,
    avg_confidence: &'static str,
    entry: &'static str,
    invalidation: &'static str,
    themes: &'static str,
    risks: &'static str,
    flagged: &'static str,
}

impl Labels {
    fn for_scope(scope: MarketScope) -> Self {
        match scope {
            MarketScope::Kr => Labels {
                title: "일일 리서치 리포트",
                decisions: "판단",
                avg_confidence: "평균 신뢰도",
                entry: "진입 조건",
                invalidation: "무효화 조건",
                themes: "주요 테마",
                risks: "주요 리스크",
                flagged: "근거 불충분 판단",
            },
            MarketScope::Us => Labels {
                title: "Daily research report",
                decisions: "Decisions",
                avg_confidence: "avg confidence",
                entry: "Entry",
                invalidation: "Invalidation",
                themes: "Themes",
                risks: "Risks",
                flagged: "Placeholder theses",
            },
        }
    }
}
