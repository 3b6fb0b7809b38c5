use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::errors::StoreError;
use crate::io::{
    read_product_details, read_purchase_facts, CustomerId, ProductDetail, ProductId,
    ProductLineId, PurchaseFact,
};
use crate::store::{select_details, select_lines, PurchaseHistoryStore};

/// Purchase history backed by two csv exports: order lines (`purchases_path`)
/// and the product catalogue (`products_path`).
///
/// Files are re-read on every call, so a cache refresh picks up a newer export
/// without restarting the process.
pub struct CsvPurchaseStore {
    purchases_path: PathBuf,
    products_path: PathBuf,
}

impl CsvPurchaseStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(purchases_path: P, products_path: Q) -> Self {
        CsvPurchaseStore {
            purchases_path: purchases_path.as_ref().to_path_buf(),
            products_path: products_path.as_ref().to_path_buf(),
        }
    }

    fn read_catalogue(&self) -> Result<HashMap<ProductId, ProductDetail>, StoreError> {
        Ok(read_product_details(&self.products_path)?
            .into_iter()
            .map(|detail| (detail.product_id, detail))
            .collect())
    }
}

/// Sums purchase counts per (customer, product) and keeps the most recent purchase date.
pub fn aggregate_purchases(rows: Vec<PurchaseFact>) -> Vec<PurchaseFact> {
    let mut aggregated: HashMap<(CustomerId, ProductId), PurchaseFact> =
        HashMap::with_capacity(rows.len());
    for row in rows.into_iter() {
        match aggregated.entry((row.customer_id, row.product_id)) {
            Entry::Occupied(mut entry) => {
                let fact = entry.get_mut();
                fact.purchase_count += row.purchase_count;
                if row.last_purchase_date > fact.last_purchase_date {
                    fact.last_purchase_date = row.last_purchase_date;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(row);
            }
        }
    }
    aggregated
        .into_iter()
        .sorted_by_key(|(key, _)| *key)
        .map(|(_, fact)| fact)
        .collect()
}

impl PurchaseHistoryStore for CsvPurchaseStore {
    fn fetch_purchase_facts(&self) -> Result<Vec<PurchaseFact>, StoreError> {
        let start_time = Instant::now();
        let rows = read_purchase_facts(&self.purchases_path)?;
        let qty_rows = rows.len();
        let facts = aggregate_purchases(rows);
        debug!(
            path = %self.purchases_path.display(),
            qty_rows,
            qty_facts = facts.len(),
            elapsed_micros = start_time.elapsed().as_micros() as u64,
            "read purchase history"
        );
        Ok(facts)
    }

    fn fetch_customer_product_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<ProductId>, StoreError> {
        Ok(read_purchase_facts(&self.purchases_path)?
            .into_iter()
            .filter(|row| row.customer_id == customer_id)
            .map(|row| row.product_id)
            .collect())
    }

    fn fetch_product_details(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductDetail>, StoreError> {
        Ok(select_details(&self.read_catalogue()?, product_ids))
    }

    fn fetch_product_lines(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductLineId>, StoreError> {
        Ok(select_lines(&self.read_catalogue()?, product_ids))
    }
}
