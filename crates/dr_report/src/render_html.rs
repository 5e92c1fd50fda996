//! Deterministic, offline HTML renderer.
//!
//! One self-contained page with inline CSS and no external assets. Static
//! strings come from a small phrasebook (`zh` or `en`, English fallback);
//! every model-supplied string is HTML-escaped.

use std::fmt::Write as _;

use dr_core::Level;

use crate::{IdealRow, LevelCount, NoteRow, RankRow, ReportModel};

// ------------------------- phrasebook -------------------------

#[derive(Copy, Clone)]
struct Phrase {
    key: &'static str,
    en: &'static str,
    zh: &'static str,
}

const PHRASES: &[Phrase] = &[
    Phrase { key: "title",        en: "Disaster-Reduction Capability Evaluation", zh: "防灾减灾能力评估报告" },
    Phrase { key: "strategy",     en: "Strategy",              zh: "计算策略" },
    Phrase { key: "scheme",       en: "Grading scheme",        zh: "分级方案" },
    Phrase { key: "regions",      en: "Regions",               zh: "区域数" },
    Phrase { key: "indicators",   en: "Indicators",            zh: "指标" },
    Phrase { key: "baseline",     en: "Single region scored against a theoretical baseline.", zh: "单一区域，按理论基准计算。" },
    Phrase { key: "cohort",       en: "Cohort",                zh: "群体统计" },
    Phrase { key: "mean",         en: "Mean",                  zh: "均值" },
    Phrase { key: "stdev",        en: "Std. deviation",        zh: "标准差" },
    Phrase { key: "ranking",      en: "Ranking",               zh: "排名" },
    Phrase { key: "rank",         en: "#",                     zh: "名次" },
    Phrase { key: "region",       en: "Region",                zh: "区域" },
    Phrase { key: "score",        en: "Score",                 zh: "综合得分" },
    Phrase { key: "level",        en: "Level",                 zh: "等级" },
    Phrase { key: "d_pos",        en: "D+",                    zh: "正理想距离" },
    Phrase { key: "d_neg",        en: "D−",                    zh: "负理想距离" },
    Phrase { key: "defaulted",    en: "default score",         zh: "默认得分" },
    Phrase { key: "distribution", en: "Level distribution",    zh: "等级分布" },
    Phrase { key: "count",        en: "Count",                 zh: "数量" },
    Phrase { key: "share",        en: "Share %",               zh: "占比 %" },
    Phrase { key: "ideal",        en: "Ideal solutions",       zh: "理想解" },
    Phrase { key: "indicator",    en: "Indicator",             zh: "指标" },
    Phrase { key: "positive",     en: "Positive",              zh: "正理想解" },
    Phrase { key: "negative",     en: "Negative",              zh: "负理想解" },
    Phrase { key: "spread",       en: "Spread",                zh: "差值" },
    Phrase { key: "warnings",     en: "Warnings",              zh: "警告" },
    Phrase { key: "fixes",        en: "Applied fixes",         zh: "已应用的修复" },
    Phrase { key: "none",         en: "None.",                 zh: "无。" },
    Phrase { key: "integrity",    en: "Integrity",             zh: "完整性" },
    Phrase { key: "eval_id",      en: "Evaluation ID",         zh: "评估标识" },
];

fn is_zh(lang: &str) -> bool {
    lang == "zh" || lang.starts_with("zh-") || lang.starts_with("zh_")
}

fn t(lang: &str, key: &str) -> &'static str {
    let zh = is_zh(lang);
    PHRASES
        .iter()
        .find(|p| p.key == key)
        .map(|p| if zh { p.zh } else { p.en })
        .unwrap_or("")
}

fn level_label(lang: &str, level: Level, label: &str) -> String {
    if is_zh(lang) {
        return label.to_string();
    }
    match level {
        Level::Strong => "Strong",
        Level::AboveAverage => "Above average",
        Level::Average => "Average",
        Level::BelowAverage => "Below average",
        Level::Weak => "Weak",
    }
    .to_string()
}

fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

// ------------------------- HTML builder -------------------------

pub struct HtmlBuilder<'a> {
    lang: &'a str,
    buf: String,
}

impl<'a> HtmlBuilder<'a> {
    pub fn new(lang: &'a str) -> Self {
        Self {
            lang,
            buf: String::with_capacity(16 * 1024),
        }
    }

    pub fn start(&mut self, title: &str) {
        let _ = write!(
            self.buf,
            "<!doctype html><html lang=\"{}\"><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
             <title>{}</title>\
             <style>\
             body{{font-family:system-ui,-apple-system,\"Noto Sans SC\",Roboto,Arial,sans-serif;margin:24px;}}\
             h1,h2,h3{{margin:0.2em 0;}}\
             .kv ul{{list-style:none;padding-left:0}}\
             .muted{{opacity:0.8}}\
             .pill{{display:inline-block;padding:.1em .5em;border-radius:9999px;background:#eee;font-size:.85em}}\
             table{{border-collapse:collapse;margin:6px 0}}\
             td,th{{padding:4px 8px;border-bottom:1px solid #ddd;text-align:left}}\
             td.num{{text-align:right;font-variant-numeric:tabular-nums}}\
             code{{font-size:.85em}}\
             </style></head><body>",
            esc(self.lang),
            esc(title)
        );
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</body></html>");
        self.buf
    }

    pub fn section_cover(
        &mut self,
        strategy: &str,
        scheme: &str,
        region_count: usize,
        indicators: &[String],
        theoretical_baseline: bool,
    ) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h1>{}</h1><div class=\"kv\"><ul>\
             <li><b>{}</b>: {}</li><li><b>{}</b>: {}</li>\
             <li><b>{}</b>: {}</li><li><b>{}</b>: {}</li></ul></div>",
            esc(t(l, "title")),
            esc(t(l, "strategy")), esc(strategy),
            esc(t(l, "scheme")), esc(scheme),
            esc(t(l, "regions")), region_count,
            esc(t(l, "indicators")), esc(&indicators.join(", ")),
        );
        if theoretical_baseline {
            let _ = write!(self.buf, "<p class=\"muted\">{}</p>", esc(t(l, "baseline")));
        }
    }

    pub fn section_cohort(&mut self, count: usize, mean: &str, stdev: &str) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h3>{}</h3><p>n = {} &nbsp;|&nbsp; {}: {} &nbsp;|&nbsp; {}: {}</p>",
            esc(t(l, "cohort")),
            count,
            esc(t(l, "mean")), esc(mean),
            esc(t(l, "stdev")), esc(stdev),
        );
    }

    pub fn section_ranking(&mut self, rows: &[RankRow]) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h3>{}</h3><table><thead><tr>\
             <th>{}</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th>\
             </tr></thead><tbody>",
            esc(t(l, "ranking")),
            esc(t(l, "rank")), esc(t(l, "region")), esc(t(l, "score")),
            esc(t(l, "level")), esc(t(l, "d_pos")), esc(t(l, "d_neg")),
        );
        for r in rows {
            let _ = write!(
                self.buf,
                "<tr><td class=\"num\">{}</td><td>{}</td><td class=\"num\">{}</td><td>{}",
                r.rank,
                esc(&r.region),
                esc(&r.score),
                esc(&level_label(l, r.level, &r.label)),
            );
            if r.defaulted {
                let _ = write!(self.buf, " <span class=\"pill\">{}</span>", esc(t(l, "defaulted")));
            }
            let _ = write!(
                self.buf,
                "</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
                esc(&r.positive_distance),
                esc(&r.negative_distance),
            );
        }
        self.buf.push_str("</tbody></table>");
    }

    pub fn section_distribution(&mut self, counts: &[LevelCount]) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h3>{}</h3><table><thead><tr><th>{}</th><th>{}</th><th>{}</th></tr></thead><tbody>",
            esc(t(l, "distribution")),
            esc(t(l, "level")), esc(t(l, "count")), esc(t(l, "share")),
        );
        for c in counts {
            let _ = write!(
                self.buf,
                "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
                esc(&level_label(l, c.level, &c.label)),
                c.count,
                esc(&c.share_pct_1dp),
            );
        }
        self.buf.push_str("</tbody></table>");
    }

    pub fn section_ideal(&mut self, rows: &[IdealRow]) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h3>{}</h3><table><thead><tr><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr></thead><tbody>",
            esc(t(l, "ideal")),
            esc(t(l, "indicator")), esc(t(l, "positive")), esc(t(l, "negative")), esc(t(l, "spread")),
        );
        for r in rows {
            let _ = write!(
                self.buf,
                "<tr><td><code>{}</code></td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
                esc(&r.indicator),
                esc(&r.positive),
                esc(&r.negative),
                esc(&r.spread),
            );
        }
        self.buf.push_str("</tbody></table>");
    }

    /// Titled list of notes; an empty list prints "None.".
    pub fn section_notes(&mut self, title_key: &str, notes: &[NoteRow]) {
        let l = self.lang;
        let _ = write!(self.buf, "<h3>{}</h3>", esc(t(l, title_key)));
        if notes.is_empty() {
            let _ = write!(self.buf, "<p class=\"muted\">{}</p>", esc(t(l, "none")));
            return;
        }
        self.buf.push_str("<ul>");
        for n in notes {
            let _ = write!(
                self.buf,
                "<li><code>{}</code> <span class=\"muted\">{}</span>: {}</li>",
                esc(&n.code),
                esc(&n.location),
                esc(&n.message),
            );
        }
        self.buf.push_str("</ul>");
    }

    pub fn section_integrity(&mut self, evaluation_id: &str, digests: &[(&str, Option<&str>)]) {
        let l = self.lang;
        let _ = write!(
            self.buf,
            "<h3>{}</h3><div class=\"kv\"><ul><li><b>{}</b>: <code>{}</code></li>",
            esc(t(l, "integrity")),
            esc(t(l, "eval_id")),
            esc(evaluation_id),
        );
        for (name, digest) in digests {
            if let Some(d) = digest {
                let _ = write!(self.buf, "<li><b>{}</b>: <code>{}</code></li>", esc(name), esc(d));
            }
        }
        self.buf.push_str("</ul></div>");
    }
}

// ------------------------- entry point -------------------------

/// Render the full page in fixed section order.
pub fn render_html(model: &ReportModel, lang: &str) -> String {
    let mut h = HtmlBuilder::new(lang);
    h.start(t(lang, "title"));

    let c = &model.cover;
    h.section_cover(&c.strategy, &c.scheme, c.region_count, &c.indicators, c.theoretical_baseline);
    h.section_cohort(model.cohort.count, &model.cohort.mean, &model.cohort.stdev);
    h.section_ranking(&model.ranking);
    h.section_distribution(&model.distribution);
    h.section_ideal(&model.ideal);
    h.section_notes("warnings", &model.warnings);
    h.section_notes("fixes", &model.fixes);

    let i = &model.integrity;
    h.section_integrity(
        &i.evaluation_id,
        &[
            ("matrix sha256", i.matrix_sha256.as_deref()),
            ("weights sha256", i.weights_sha256.as_deref()),
            ("params sha256", i.params_sha256.as_deref()),
        ],
    );
    h.finish()
}
