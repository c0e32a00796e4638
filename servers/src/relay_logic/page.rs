use lib_common::store::StoreView;

const NO_DATA: &str = "<p>No data available.</p>";

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { width: 80%; margin: 0 auto; background-color: white; padding: 20px; box-shadow: 0 0 10px rgba(0, 0, 0, 0.1); }
        h1 { text-align: center; color: #333; }
        .csv-table { max-height: 400px; overflow-y: scroll; margin-top: 20px; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 8px; text-align: left; border: 1px solid #ddd; }
        th { background-color: #f2f2f2; }
        .download-btn { display: block; text-align: center; margin-top: 20px; padding: 10px 20px; background-color: #4CAF50; color: white; text-decoration: none; border-radius: 5px; }
        .download-btn:hover { background-color: #45a049; }
"#;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The table markup, or the no-data notice when the store was never created.
pub fn render_table(view: &StoreView) -> String {
    let StoreView::Present { header, rows } = view else {
        return NO_DATA.to_string();
    };

    let mut html = String::from("<table class=\"data\">\n<thead>\n<tr>");
    for cell in header {
        html.push_str(&format!("<th>{}</th>", escape_html(cell)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

pub fn render_page(view: &StoreView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>CSV Data</title>
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <h1>CSV Data</h1>
        <div class="csv-table">
{table}
        </div>
        <a href="/download" class="download-btn">Click here to download the CSV file</a>
    </div>
</body>
</html>
"#,
        style = STYLE,
        table = render_table(view)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_store_shows_notice() {
        let html = render_page(&StoreView::Absent);
        assert!(html.contains("No data available."));
        assert!(!html.contains("<table"));
        assert!(html.contains("href=\"/download\""));
    }

    #[test]
    fn empty_store_shows_an_empty_table() {
        let html = render_table(&StoreView::Present {
            header: vec![],
            rows: vec![],
        });
        assert!(html.starts_with("<table"));
        assert!(!html.contains("No data available."));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn cells_are_escaped() {
        let html = render_table(&StoreView::Present {
            header: vec!["station".into(), "note".into()],
            rows: vec![vec!["ALBA".into(), "<script>&\"".into()]],
        });
        assert!(html.contains("<th>station</th><th>note</th>"));
        assert!(html.contains("<td>&lt;script&gt;&amp;&quot;</td>"));
    }
}
