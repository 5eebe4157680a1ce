/// GitHub-flavored Markdown table. Pipes inside cells are escaped.
pub fn markdown_table(headers: &[&str], records: &[Vec<String>]) -> String {
    let row = |cells: Vec<String>| format!("| {} |", cells.join(" | "));

    let mut out = Vec::with_capacity(records.len() + 2);
    out.push(row(headers.iter().map(|h| escape_cell(h)).collect()));
    out.push(row(headers.iter().map(|_| "---".to_string()).collect()));
    for record in records {
        out.push(row(record.iter().map(|c| escape_cell(c)).collect()));
    }
    out.join("\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}
