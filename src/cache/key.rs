use std::fmt;

/// Typed cache key: the resource plus only the parameters that change the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Vendors,
    Products,
    Categories,
    SubCategories,
    CategoryWithProducts { category_id: String },
    Ratings { product_id: String, page: u32 },
}

impl CacheKey {
    pub fn category_with_products(category_id: impl Into<String>) -> Self {
        CacheKey::CategoryWithProducts {
            category_id: category_id.into(),
        }
    }

    pub fn ratings(product_id: impl Into<String>, page: u32) -> Self {
        CacheKey::Ratings {
            product_id: product_id.into(),
            page,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Vendors => write!(f, "vendors"),
            CacheKey::Products => write!(f, "products"),
            CacheKey::Categories => write!(f, "categories"),
            CacheKey::SubCategories => write!(f, "sub-categories"),
            CacheKey::CategoryWithProducts { category_id } => {
                write!(f, "categories-with-products:{}", category_id)
            }
            CacheKey::Ratings { product_id, page } => {
                write!(f, "ratings:{}:page:{}", product_id, page)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identical_parameters_give_equal_keys() {
        assert_eq!(CacheKey::ratings("42", 2), CacheKey::ratings("42", 2));
        assert_eq!(
            CacheKey::ratings("42", 2).to_string(),
            CacheKey::ratings(String::from("42"), 2).to_string()
        );
    }

    #[test]
    fn test_relevant_parameters_never_collide() {
        let keys: HashSet<CacheKey> = [
            CacheKey::ratings("42", 1),
            CacheKey::ratings("42", 2),
            CacheKey::ratings("43", 1),
            CacheKey::category_with_products("42"),
            CacheKey::category_with_products("43"),
            CacheKey::Categories,
            CacheKey::SubCategories,
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_string_form() {
        assert_eq!(CacheKey::Vendors.to_string(), "vendors");
        assert_eq!(CacheKey::SubCategories.to_string(), "sub-categories");
        assert_eq!(
            CacheKey::category_with_products("7").to_string(),
            "categories-with-products:7"
        );
        assert_eq!(CacheKey::ratings("9", 3).to_string(), "ratings:9:page:3");
    }
}
