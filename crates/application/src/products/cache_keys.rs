//! Cache keys for product queries.

use common::ProductId;

/// Prefix shared by every cached product listing page.
pub const LIST_PREFIX: &str = "products:list";

/// Key of a single cached product.
pub fn product(id: ProductId) -> String {
    format!("products:id:{id}")
}

/// Key of one cached listing page. Missing sort options are written as `null`.
pub fn list(
    page_number: u32,
    page_size: u32,
    sort_field: Option<&str>,
    sort_direction: Option<&str>,
) -> String {
    format!(
        "{LIST_PREFIX}:p{page_number}:s{page_size}:sf{}:sd{}",
        normalize(sort_field),
        normalize(sort_direction)
    )
}

fn normalize(option: Option<&str>) -> String {
    option
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key_format() {
        assert_eq!(list(1, 20, None, None), "products:list:p1:s20:sfnull:sdnull");
        assert_eq!(
            list(2, 10, Some("Price"), Some(" DESC ")),
            "products:list:p2:s10:sfprice:sddesc"
        );
        assert!(list(3, 5, Some(""), None).starts_with(LIST_PREFIX));
    }

    #[test]
    fn test_product_key_format() {
        let id = ProductId::new();
        assert_eq!(product(id), format!("products:id:{id}"));
    }
}
