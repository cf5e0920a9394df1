//! CSV exchange for the product master and the request log.
//!
//! The import side accepts what floor spreadsheets actually produce:
//! semicolon or comma separators, decimal commas, and a localized header
//! row. Malformed rows are skipped, never fatal. Exports mirror the
//! legacy planner's files so downstream sheets keep working.

use shortfall_types::{Product, ShortageRequest};

/// Parse product rows from CSV text.
///
/// Each non-empty line splits on `;` when present, else on `,`, and
/// needs at least `code, description, weight`. Rows with an empty code
/// or description, or a weight that is not a positive number, are
/// dropped silently.
pub fn parse_products(body: &str) -> Vec<Product> {
    let mut products = Vec::new();
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let separator = if line.contains(';') { ';' } else { ',' };
        let fields: Vec<&str> = line.split(separator).map(str::trim).collect();
        if index == 0 && is_header(&fields) {
            continue;
        }
        if fields.len() < 3 {
            continue;
        }
        let code = fields[0];
        let description = fields[1];
        if code.is_empty() || description.is_empty() {
            continue;
        }
        let weight = match parse_weight(fields[2]) {
            Some(weight) => weight,
            None => continue,
        };
        products.push(Product::new(code, description, weight));
    }
    products
}

/// The legacy planner labels the code column "código"
fn is_header(fields: &[&str]) -> bool {
    fields
        .first()
        .map_or(false, |first| first.to_lowercase().contains("código"))
}

/// Parse a weight cell, accepting a decimal comma
fn parse_weight(cell: &str) -> Option<f64> {
    let normalized = cell.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight > 0.0 => Some(weight),
        _ => None,
    }
}

/// Product master export: `CODE;DESCRIPTION;UNIT_WEIGHT_KG`.
///
/// Descriptions go out unquoted so the file re-imports through
/// [`parse_products`] unchanged.
pub fn render_products(products: &[Product]) -> String {
    let mut out = String::from("CODE;DESCRIPTION;UNIT_WEIGHT_KG\n");
    for product in products {
        out.push_str(&format!(
            "{};{};{}\n",
            product.code,
            product.description,
            decimal_comma(product.weight_per_unit)
        ));
    }
    out
}

/// Request log export, one row per request with the description quoted
pub fn render_requests(requests: &[ShortageRequest]) -> String {
    let mut out = String::from(
        "REQUEST_ID;LOAD;PRODUCT_CODE;DESCRIPTION;QUANTITY;TOTAL_WEIGHT_KG;PRIORITY;STATUS;REPORTED_AT;REPORTED_BY\n",
    );
    for request in requests {
        let row = [
            request.id.0.clone(),
            request.load_number.clone().unwrap_or_default(),
            request.code.clone(),
            quote(&request.description),
            request.quantity.to_string(),
            decimal_comma(request.total_weight),
            if request.priority { "YES" } else { "NO" }.to_string(),
            request.status.name().to_string(),
            request.timestamps.reported.date.to_rfc3339(),
            request.timestamps.reported.user.clone(),
        ];
        out.push_str(&row.join(";"));
        out.push('\n');
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn decimal_comma(value: f64) -> String {
    format!("{value:.3}").replace('.', ",")
}
