use hashbrown::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::errors::StoreError;
use crate::io::{CustomerId, ProductDetail, ProductId, ProductLineId, PurchaseFact};
use crate::store::{select_details, select_lines, PurchaseHistoryStore};

/// Purchase history held in process memory. Facts are expected to be
/// aggregated per (customer, product) already.
pub struct InMemoryPurchaseStore {
    facts: RwLock<Vec<PurchaseFact>>,
    products: RwLock<HashMap<ProductId, ProductDetail>>,
    qty_fact_fetches: AtomicUsize,
}

impl InMemoryPurchaseStore {
    pub fn new(facts: Vec<PurchaseFact>, products: Vec<ProductDetail>) -> Self {
        let products = products
            .into_iter()
            .map(|detail| (detail.product_id, detail))
            .collect();
        InMemoryPurchaseStore {
            facts: RwLock::new(facts),
            products: RwLock::new(products),
            qty_fact_fetches: AtomicUsize::new(0),
        }
    }

    pub fn replace_facts(&self, facts: Vec<PurchaseFact>) {
        *self.facts.write().unwrap_or_else(PoisonError::into_inner) = facts;
    }

    pub fn add_fact(&self, fact: PurchaseFact) {
        self.facts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fact);
    }

    pub fn add_product(&self, detail: ProductDetail) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(detail.product_id, detail);
    }

    /// How often the full fact table has been read, i.e. how many refreshes hit this store.
    pub fn qty_fact_fetches(&self) -> usize {
        self.qty_fact_fetches.load(Ordering::SeqCst)
    }
}

impl PurchaseHistoryStore for InMemoryPurchaseStore {
    fn fetch_purchase_facts(&self) -> Result<Vec<PurchaseFact>, StoreError> {
        self.qty_fact_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .facts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn fetch_customer_product_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<ProductId>, StoreError> {
        Ok(self
            .facts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|fact| fact.customer_id == customer_id)
            .map(|fact| fact.product_id)
            .collect())
    }

    fn fetch_product_details(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductDetail>, StoreError> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(select_details(&products, product_ids))
    }

    fn fetch_product_lines(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> Result<HashMap<ProductId, ProductLineId>, StoreError> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(select_lines(&products, product_ids))
    }
}

#[cfg(test)]
mod memory_test {
    use super::*;
    use chrono::NaiveDate;

    fn fact(customer_id: CustomerId, product_id: ProductId, count: f64) -> PurchaseFact {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PurchaseFact::new(customer_id, product_id, count, date)
    }

    fn product(product_id: ProductId, product_line_id: ProductLineId) -> ProductDetail {
        ProductDetail {
            product_id,
            name: format!("product {}", product_id),
            price: 9.99,
            product_line_id,
        }
    }

    #[test]
    fn should_answer_batched_lookups() {
        let store = InMemoryPurchaseStore::new(
            vec![fact(1, 10, 2.0), fact(1, 11, 1.0), fact(2, 12, 4.0)],
            vec![product(10, 1), product(11, 1), product(12, 2)],
        );

        let owned = store.fetch_customer_product_ids(1).unwrap();
        assert_eq!(2, owned.len());
        assert!(owned.contains(&10) && owned.contains(&11));

        let requested: HashSet<ProductId> = vec![10, 12, 99].into_iter().collect();
        let lines = store.fetch_product_lines(&requested).unwrap();
        assert_eq!(2, lines.len());
        assert_eq!(Some(&2), lines.get(&12));
        assert!(!lines.contains_key(&99));

        let details = store.fetch_product_details(&requested).unwrap();
        assert_eq!(2, details.len());
        assert_eq!("product 10", details[&10].name);

        assert_eq!(Some(1), store.fetch_product_line(11).unwrap());
        assert_eq!(None, store.fetch_product_line(99).unwrap());

        store.add_product(product(99, 3));
        assert_eq!(Some(3), store.fetch_product_line(99).unwrap());
    }

    #[test]
    fn should_count_fact_fetches() {
        let store = InMemoryPurchaseStore::new(vec![fact(1, 10, 2.0)], vec![]);
        assert_eq!(0, store.qty_fact_fetches());
        store.fetch_purchase_facts().unwrap();
        store.add_fact(fact(2, 10, 1.0));
        assert_eq!(2, store.fetch_purchase_facts().unwrap().len());
        assert_eq!(2, store.qty_fact_fetches());

        store.replace_facts(vec![]);
        assert!(store.fetch_purchase_facts().unwrap().is_empty());
        assert_eq!(3, store.qty_fact_fetches());
    }
}
