use crate::db::models::DbPackage;

/// Packages whose `appName + " " + description` contains `query`, ignoring
/// case and surrounding whitespace. A blank query keeps everything.
pub fn filter_packages<'a>(packages: &'a [DbPackage], query: &str) -> Vec<&'a DbPackage> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return packages.iter().collect();
    }
    packages
        .iter()
        .filter(|p| format!("{} {}", p.app_name, p.description).to_lowercase().contains(&q))
        .collect()
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

/// What the package grid shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridView {
    /// The "no apps" placeholder.
    Empty,
    Cards(Vec<String>),
}

pub fn render_grid(packages: &[&DbPackage]) -> GridView {
    if packages.is_empty() {
        return GridView::Empty;
    }
    GridView::Cards(packages.iter().map(|p| render_card(p)).collect())
}

fn render_card(p: &DbPackage) -> String {
    let name = escape_html(&p.app_name);
    format!(
        concat!(
            r#"<div class="card">"#,
            r#"<img src="{icon}" alt="{name}" />"#,
            "<h3>{name}</h3>",
            "<p>{description}</p>",
            r#"<a class="btn" href="{apk}" download>Download</a>"#,
            "</div>"
        ),
        icon = escape_html(&p.icon_path),
        name = name,
        description = escape_html(&p.description),
        apk = escape_html(&p.package_path),
    )
}
