pub const QUERY_SUFFIX: &str = "product";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: String,
    pub description: String,
    pub supplier: Option<String>,
    pub brand: Option<String>,
    pub selected_values: Vec<String>,
}

impl ProductRecord {
    pub fn new(
        index: usize,
        id: &str,
        description: &str,
        supplier: Option<&str>,
        brand: Option<&str>,
    ) -> Self {
        let mut selected_values = vec![id.to_string(), description.to_string()];
        selected_values.extend(supplier.map(str::to_string));
        selected_values.extend(brand.map(str::to_string));

        let id = if id.trim().is_empty() {
            format!("Row_{}", index)
        } else {
            id.to_string()
        };

        ProductRecord {
            id,
            description: description.to_string(),
            supplier: supplier.map(str::to_string),
            brand: brand.map(str::to_string),
            selected_values,
        }
    }

    pub fn supplier(&self) -> &str {
        self.supplier.as_deref().unwrap_or("")
    }

    pub fn brand(&self) -> &str {
        self.brand.as_deref().unwrap_or("")
    }

    pub fn search_query(&self) -> String {
        compose_query(&self.description, self.supplier(), self.brand())
    }

    pub fn short_description(&self, max_chars: usize) -> String {
        self.description.chars().take(max_chars).collect()
    }
}

/// Builds the engine query: non-empty brand, supplier and description in that
/// order, followed by [`QUERY_SUFFIX`]. Never empty.
pub fn compose_query(description: &str, supplier: &str, brand: &str) -> String {
    let mut parts: Vec<&str> = [brand, supplier, description]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();
    parts.push(QUERY_SUFFIX);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_orders_brand_supplier_description() {
        assert_eq!(compose_query("widget", "", "Acme"), "Acme widget product");
        assert_eq!(compose_query("widget", "Grainger", "Acme"), "Acme Grainger widget product");
    }

    #[test]
    fn query_is_never_empty() {
        assert_eq!(compose_query("", "", ""), "product");
        assert_eq!(compose_query("  ", " ", "\t"), "product");
    }

    #[test]
    fn missing_id_falls_back_to_row_index() {
        let record = ProductRecord::new(7, "  ", "Cordless drill", None, Some("Makita"));
        assert_eq!(record.id, "Row_7");
        assert_eq!(record.search_query(), "Makita Cordless drill product");
        assert_eq!(record.selected_values, vec!["  ", "Cordless drill", "Makita"]);
    }

    #[test]
    fn short_description_respects_char_boundaries() {
        let record = ProductRecord::new(0, "A1", "Café crème machine", None, None);
        assert_eq!(record.short_description(5), "Café ");
    }
}
