//! Pure catalog filtering, sorting and pagination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothify_core::Category;

use crate::models::Product;

/// Products per page on the shop view.
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Boundary between the two preset price bands.
pub const PRICE_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Price band selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceMode {
    #[default]
    All,
    /// `price < 1000`
    #[serde(alias = "under1000")]
    UnderThreshold,
    /// `price >= 1000`
    #[serde(alias = "above1000")]
    AtOrAboveThreshold,
    /// Inclusive `[min_price, max_price]`.
    Custom,
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Keep catalog order.
    #[default]
    Default,
    #[serde(alias = "lowToHigh")]
    LowToHigh,
    #[serde(alias = "highToLow")]
    HighToLow,
}

/// Shop view query. Deserializes directly from the URL query string.
///
/// `min_price` and `max_price` stay raw so that malformed input falls back to
/// the defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub search: String,
    pub category: Option<String>,
    pub price_mode: PriceMode,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: SortOrder,
    pub page: usize,
    pub page_size: Option<usize>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub items: Vec<Product>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl CatalogQuery {
    fn page(&self) -> usize {
        self.page.max(1)
    }

    fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    fn price_bounds(&self) -> (Decimal, Option<Decimal>) {
        let parse = |raw: Option<&String>| raw.and_then(|s| s.trim().parse::<Decimal>().ok());
        (parse(self.min_price.as_ref()).unwrap_or(Decimal::ZERO), parse(self.max_price.as_ref()))
    }

    fn matches(&self, product: &Product) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty() && !product.name.to_lowercase().contains(&search) {
            return false;
        }

        if let Some(selected) = self.category() {
            let in_category = selected
                .parse::<Category>()
                .is_ok_and(|c| product.in_category(c));
            if !in_category {
                return false;
            }
        }

        match self.price_mode {
            PriceMode::All => true,
            PriceMode::UnderThreshold => product.price < PRICE_THRESHOLD,
            PriceMode::AtOrAboveThreshold => product.price >= PRICE_THRESHOLD,
            PriceMode::Custom => {
                let (min, max) = self.price_bounds();
                product.price >= min && max.is_none_or(|max| product.price <= max)
            }
        }
    }
}

/// Filter, sort and paginate `products`.
///
/// Pure: the input is never reordered and the same arguments always yield the
/// same page. Sorting is stable, so equal prices keep catalog order.
#[must_use]
pub fn filter_and_sort(products: &[Product], query: &CatalogQuery) -> CatalogPage {
    let mut filtered: Vec<&Product> = products.iter().filter(|p| query.matches(p)).collect();

    match query.sort {
        SortOrder::Default => {}
        SortOrder::LowToHigh => filtered.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::HighToLow => filtered.sort_by(|a, b| b.price.cmp(&a.price)),
    }

    let page = query.page();
    let page_size = query.page_size();
    let total_items = filtered.len();
    let total_pages = total_items.div_ceil(page_size);

    let items = filtered
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    CatalogPage {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use clothify_core::ProductId;

    fn product(id: &str, name: &str, price: i64, categories: &[Category]) -> Product {
        Product {
            id: ProductId::from(id),
            name: name.to_string(),
            price: Decimal::from(price),
            quantity: 10,
            image: String::new(),
            categories: categories.to_vec(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("1", "Cotton Tee", 499, &[Category::Men, Category::Women]),
            product("2", "Wool Coat", 4999, &[Category::Women]),
            product("3", "Kids Hoodie", 999, &[Category::Kids]),
            product("4", "Leather Belt", 1000, &[Category::Accessories]),
            product("5", "Graphic Tee", 499, &[Category::Men]),
        ]
    }

    fn ids(page: &CatalogPage) -> Vec<&str> {
        page.items.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_thirteen_items_page_size_six() {
        let products: Vec<Product> = (0..13)
            .map(|i| product(&i.to_string(), "Item", 100, &[]))
            .collect();
        let mut query = CatalogQuery {
            page_size: Some(6),
            page: 3,
            ..CatalogQuery::default()
        };

        let page = filter_and_sort(&products, &query);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 1);

        query.page = 4;
        let page = filter_and_sort(&products, &query);
        assert_eq!(page.total_pages, 3);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_default_page_size_is_nine() {
        let products: Vec<Product> = (0..10)
            .map(|i| product(&i.to_string(), "Item", 100, &[]))
            .collect();
        let page = filter_and_sort(&products, &CatalogQuery::default());
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 9);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_pure_and_deterministic() {
        let products = catalog();
        let before = products.clone();
        let query = CatalogQuery {
            sort: SortOrder::HighToLow,
            ..CatalogQuery::default()
        };

        let first = filter_and_sort(&products, &query);
        let second = filter_and_sort(&products, &query);

        assert_eq!(products, before);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let query = CatalogQuery {
            search: "TEE".to_string(),
            ..CatalogQuery::default()
        };
        assert_eq!(ids(&filter_and_sort(&catalog(), &query)), vec!["1", "5"]);
    }

    #[test]
    fn test_category_filter() {
        let mut query = CatalogQuery {
            category: Some("Women".to_string()),
            ..CatalogQuery::default()
        };
        assert_eq!(ids(&filter_and_sort(&catalog(), &query)), vec!["1", "2"]);

        query.category = Some("All".to_string());
        assert_eq!(filter_and_sort(&catalog(), &query).total_items, 5);

        query.category = Some("Shoes".to_string());
        assert_eq!(filter_and_sort(&catalog(), &query).total_items, 0);
    }

    #[test]
    fn test_price_threshold_bands() {
        let mut query = CatalogQuery {
            price_mode: PriceMode::UnderThreshold,
            ..CatalogQuery::default()
        };
        assert_eq!(ids(&filter_and_sort(&catalog(), &query)), vec!["1", "3", "5"]);

        query.price_mode = PriceMode::AtOrAboveThreshold;
        assert_eq!(ids(&filter_and_sort(&catalog(), &query)), vec!["2", "4"]);
    }

    #[test]
    fn test_custom_range_inclusive_with_defaults() {
        let mut query = CatalogQuery {
            price_mode: PriceMode::Custom,
            min_price: Some("999".to_string()),
            max_price: Some("1000".to_string()),
            ..CatalogQuery::default()
        };
        assert_eq!(ids(&filter_and_sort(&catalog(), &query)), vec!["3", "4"]);

        query.min_price = Some("abc".to_string());
        query.max_price = None;
        assert_eq!(filter_and_sort(&catalog(), &query).total_items, 5);
    }

    #[test]
    fn test_sort_is_stable() {
        let query = CatalogQuery {
            sort: SortOrder::LowToHigh,
            ..CatalogQuery::default()
        };
        assert_eq!(
            ids(&filter_and_sort(&catalog(), &query)),
            vec!["1", "5", "3", "4", "2"]
        );
    }

    #[test]
    fn test_empty_catalog_has_zero_pages() {
        let page = filter_and_sort(&[], &CatalogQuery::default());
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_query_string_aliases() {
        let query: CatalogQuery =
            serde_json::from_str(r#"{"price_mode":"under1000","sort":"highToLow"}"#).unwrap();
        assert_eq!(query.price_mode, PriceMode::UnderThreshold);
        assert_eq!(query.sort, SortOrder::HighToLow);
    }
}
