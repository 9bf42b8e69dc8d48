// Presentation adapter: turns aggregation results into what the renderers
// consume (counter text, chart specs, table fragments, export files).
use crate::error::{DashboardError, Result};
use crate::state::DashboardView;
use crate::types::{AgeGroups, GroupCount, Kpis, MemberStats};
use crate::util::format_int;
use num_format::Locale;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

const PALETTE: [&str; 8] = [
    "#4f7cff", "#3ccf91", "#ffcc66", "#ff6b6b", "#a78bfa", "#22d3ee", "#f472b6", "#f59e0b",
];

/// Cycle the palette to `n` colors.
pub fn chart_colors(n: usize) -> Vec<String> {
    PALETTE.iter().cycle().take(n).map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Doughnut,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<usize>,
    pub colors: Vec<String>,
}

/// Input for the external chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub horizontal: bool,
    pub data_labels: bool,
}

fn chart(id: &str, kind: ChartKind, labels: Vec<String>, data: Vec<usize>, colors: Vec<String>) -> ChartSpec {
    ChartSpec {
        id: id.to_string(),
        kind,
        labels,
        datasets: vec![Dataset {
            label: "Members".to_string(),
            data,
            colors,
        }],
        horizontal: false,
        data_labels: false,
    }
}

fn status_chart(id: &str, labels: [&str; 2], values: [usize; 2], colors: [&str; 2]) -> ChartSpec {
    chart(
        id,
        ChartKind::Doughnut,
        labels.iter().map(|s| s.to_string()).collect(),
        values.to_vec(),
        colors.iter().map(|s| s.to_string()).collect(),
    )
}

fn bar_chart(id: &str, counts: &[GroupCount]) -> ChartSpec {
    chart(
        id,
        ChartKind::Bar,
        counts.iter().map(|g| g.label.clone()).collect(),
        counts.iter().map(|g| g.count).collect(),
        chart_colors(counts.len()),
    )
}

fn ranking_chart(id: &str, counts: &[GroupCount]) -> ChartSpec {
    ChartSpec {
        horizontal: true,
        data_labels: true,
        ..bar_chart(id, counts)
    }
}

fn age_chart(groups: &AgeGroups) -> ChartSpec {
    let (labels, data): (Vec<String>, Vec<usize>) =
        groups.iter().map(|(b, n)| (b.to_string(), n)).unzip();
    ChartSpec {
        data_labels: true,
        ..chart("chart-age-groups", ChartKind::Pie, labels, data, chart_colors(5))
    }
}

/// Chart specs for one render. Optional charts only appear when their
/// column exists in the source.
pub fn build_charts(view: &DashboardView) -> Vec<ChartSpec> {
    let k = &view.kpis;
    let mut charts = vec![
        status_chart(
            "chart-payment",
            ["Paid", "Unpaid"],
            [k.paid, k.unpaid],
            ["#3ccf91", "#ff6b6b"],
        ),
        status_chart(
            "chart-submit",
            ["Submitted", "Pending"],
            [k.submitted, k.pending],
            ["#4f7cff", "#ffcc66"],
        ),
        bar_chart("chart-by-district", &view.by_district),
        bar_chart("chart-by-zone", &view.by_zone),
    ];
    if let Some(groups) = &view.age_groups {
        charts.push(age_chart(groups));
    }
    if let Some(top) = &view.top_professions {
        charts.push(ranking_chart("chart-top-professions", top));
    }
    if let Some(top) = &view.top_qualifications {
        charts.push(ranking_chart("chart-top-qualifications", top));
    }
    charts
}

/// Counter label/value pairs, locale formatted.
pub fn kpi_lines(kpis: &Kpis, locale: &Locale) -> Vec<(&'static str, String)> {
    vec![
        ("Total Members", format_int(kpis.total, locale)),
        ("Paid", format_int(kpis.paid, locale)),
        ("Unpaid", format_int(kpis.unpaid, locale)),
        ("Submitted", format_int(kpis.submitted, locale)),
        ("Pending", format_int(kpis.pending, locale)),
        ("Districts", format_int(kpis.distinct_districts, locale)),
        ("Zones", format_int(kpis.distinct_zones, locale)),
        ("Units", format_int(kpis.distinct_units, locale)),
    ]
}

pub fn print_kpis(kpis: &Kpis, locale: &Locale) {
    for (label, value) in kpi_lines(kpis, locale) {
        println!("{:<15} {:>10}", label, value);
    }
    println!();
}

pub fn escape_html(s: &str) -> String {
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

/// `<tr>` rows for the unit table body.
pub fn unit_rows_html(rows: &[MemberStats]) -> String {
    let mut html = String::new();
    for s in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&s.unit),
            escape_html(&s.zone),
            escape_html(&s.district),
            s.members,
            s.paid,
            s.unpaid,
            s.submitted,
            s.pending
        ));
    }
    html
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let fail = |message: String| DashboardError::Output {
        path: path.to_path_buf(),
        message,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(|e| fail(e.to_string()))?;
    for r in rows {
        wtr.serialize(r).map_err(|e| fail(e.to_string()))?;
    }
    wtr.flush().map_err(|e| fail(e.to_string()))?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let fail = |message: String| DashboardError::Output {
        path: path.to_path_buf(),
        message,
    };
    let s = serde_json::to_string_pretty(value).map_err(|e| fail(e.to_string()))?;
    std::fs::write(path, s).map_err(|e| fail(e.to_string()))?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| DashboardError::Output {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Plain-text stand-in for the age pie.
pub fn print_age_groups(groups: &AgeGroups, locale: &Locale) {
    println!("Age Groups");
    for (bucket, n) in groups.iter() {
        println!("  {:<8} {:>10}", bucket, format_int(n, locale));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> Vec<GroupCount> {
        pairs
            .iter()
            .map(|(l, c)| GroupCount {
                label: l.to_string(),
                count: *c,
            })
            .collect()
    }

    fn view() -> DashboardView {
        DashboardView {
            kpis: Kpis {
                total: 3,
                paid: 2,
                unpaid: 1,
                submitted: 1,
                pending: 2,
                distinct_districts: 1,
                distinct_zones: 2,
                distinct_units: 2,
            },
            by_district: counts(&[("A", 3)]),
            by_zone: counts(&[("Z1", 2), ("Z2", 1)]),
            unit_table: vec![],
            zone_stats: vec![],
            district_stats: vec![],
            age_groups: None,
            top_professions: Some(counts(&[("Nurse", 2)])),
            top_qualifications: None,
        }
    }

    #[test]
    fn palette_cycles() {
        let c = chart_colors(10);
        assert_eq!(c.len(), 10);
        assert_eq!(c[8], c[0]);
    }

    #[test]
    fn charts_follow_available_columns() {
        let charts = build_charts(&view());
        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["chart-payment", "chart-submit", "chart-by-district", "chart-by-zone", "chart-top-professions"]
        );
        assert_eq!(charts[0].datasets[0].data, vec![2, 1]);
        assert!(charts[4].horizontal && charts[4].data_labels);
        assert_eq!(charts[3].datasets[0].colors.len(), 2);
    }

    #[test]
    fn chart_json_shape() {
        let json = serde_json::to_value(&build_charts(&view())[0]).unwrap();
        assert_eq!(json["kind"], "doughnut");
        assert_eq!(json["labels"][1], "Unpaid");
    }

    #[test]
    fn html_cells_are_escaped() {
        let rows = vec![MemberStats {
            unit: "<b>Tom & Jerry's</b>".into(),
            zone: "\"Z\"".into(),
            district: "A".into(),
            members: 1,
            paid: 1,
            ..Default::default()
        }];
        let html = unit_rows_html(&rows);
        assert!(html.contains("&lt;b&gt;Tom &amp; Jerry&#39;s&lt;/b&gt;"));
        assert!(html.contains("&quot;Z&quot;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn kpis_use_locale_grouping() {
        let k = Kpis {
            total: 12345,
            ..Default::default()
        };
        let lines = kpi_lines(&k, &Locale::en);
        assert_eq!(lines[0], ("Total Members", "12,345".to_string()));
    }

    #[test]
    fn csv_export_has_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.csv");
        let rows = vec![MemberStats {
            unit: "U1".into(),
            members: 2,
            ..Default::default()
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Unit,Zone,District,Members,Paid,Unpaid,Submitted,Pending"));
        assert!(text.contains("U1,,,2,0,0,0,0"));
    }
}
