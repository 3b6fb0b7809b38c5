use hashbrown::{HashMap, HashSet};

use crate::errors::StoreError;
use crate::io::{CustomerId, ProductDetail, ProductId, ProductLineId, PurchaseFact};

pub mod csv_store;
pub mod memory;

pub use csv_store::CsvPurchaseStore;
pub use memory::InMemoryPurchaseStore;

/// Read access to purchase history and product metadata.
///
/// Implementations must answer the batched lookups in a single round trip to
/// their backend; callers rely on that to keep the cost of a request
/// independent of the number of candidate products.
pub trait PurchaseHistoryStore: Send + Sync {
    /// All (customer, product) purchase facts, aggregated per pair.
    fn fetch_purchase_facts(&self) -> Result<Vec<PurchaseFact>, StoreError>;

    fn fetch_customer_product_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<ProductId>, StoreError>;

    /// Products that cannot be found are absent from the returned map.
    fn fetch_product_details(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductDetail>, StoreError>;

    fn fetch_product_lines(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductLineId>, StoreError>;

    fn fetch_product_line(&self, product_id: ProductId) -> Result<Option<ProductLineId>, StoreError> {
        let mut product_ids = HashSet::with_capacity(1);
        product_ids.insert(product_id);
        Ok(self.fetch_product_lines(&product_ids)?.remove(&product_id))
    }
}

fn select_details(
    catalogue: &HashMap<ProductId, ProductDetail>,
    product_ids: &HashSet<ProductId>,
) -> HashMap<ProductId, ProductDetail> {
    product_ids
        .iter()
        .filter_map(|product_id| {
            catalogue
                .get(product_id)
                .map(|detail| (*product_id, detail.clone()))
        })
        .collect()
}

fn select_lines(
    catalogue: &HashMap<ProductId, ProductDetail>,
    product_ids: &HashSet<ProductId>,
) -> HashMap<ProductId, ProductLineId> {
    product_ids
        .iter()
        .filter_map(|product_id| {
            catalogue
                .get(product_id)
                .map(|detail| (*product_id, detail.product_line_id))
        })
        .collect()
}
