use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

pub type CustomerId = u64;
pub type ProductId = u64;
pub type ProductLineId = u64;

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Purchases of one product by one customer, aggregated over all of their orders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PurchaseFact {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub purchase_count: f64,
    #[serde(deserialize_with = "deserialize_date_time")]
    pub last_purchase_date: NaiveDateTime,
}

impl PurchaseFact {
    pub fn new(
        customer_id: CustomerId,
        product_id: ProductId,
        purchase_count: f64,
        last_purchase_date: NaiveDateTime,
    ) -> Self {
        PurchaseFact {
            customer_id,
            product_id,
            purchase_count,
            last_purchase_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product_id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(rename = "prod_line_id")]
    pub product_line_id: ProductLineId,
}

fn deserialize_date_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_time(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognised purchase date: {}", raw))
    })
}

pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Reads purchase rows with header `customer_id,product_id,purchase_count,last_purchase_date`.
/// Rows are returned as they appear in the file, no aggregation happens here.
pub fn read_purchase_facts<P: AsRef<Path>>(path: P) -> Result<Vec<PurchaseFact>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let facts: Result<Vec<PurchaseFact>, csv::Error> = reader.deserialize().collect();
    facts
}

/// Reads the product catalogue with header `product_id,name,price,prod_line_id`.
pub fn read_product_details<P: AsRef<Path>>(path: P) -> Result<Vec<ProductDetail>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let products: Result<Vec<ProductDetail>, csv::Error> = reader.deserialize().collect();
    products
}

#[cfg(test)]
mod io_test {
    use super::*;
    use std::io::Write;

    #[test]
    fn should_read_purchase_facts_in_both_date_formats() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "customer_id,product_id,purchase_count,last_purchase_date").unwrap();
        writeln!(file, "1,10,3,2023-04-01 12:30:00").unwrap();
        writeln!(file, "2, 11, 1, 2023-05-02T08:00:00").unwrap();

        let facts = read_purchase_facts(file.path()).unwrap();

        assert_eq!(2, facts.len());
        assert_eq!(1, facts[0].customer_id);
        assert_eq!(10, facts[0].product_id);
        assert!((3.0 - facts[0].purchase_count).abs() < f64::EPSILON);
        assert_eq!(
            parse_date_time("2023-05-02 08:00:00").unwrap(),
            facts[1].last_purchase_date
        );
    }

    #[test]
    fn should_reject_unparseable_dates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "customer_id,product_id,purchase_count,last_purchase_date").unwrap();
        writeln!(file, "1,10,3,yesterday").unwrap();

        assert!(read_purchase_facts(file.path()).is_err());
    }

    #[test]
    fn should_read_product_details() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "product_id,name,price,prod_line_id").unwrap();
        writeln!(file, "10,Espresso cups,12.50,3").unwrap();

        let products = read_product_details(file.path()).unwrap();

        assert_eq!(
            vec![ProductDetail {
                product_id: 10,
                name: "Espresso cups".to_string(),
                price: 12.5,
                product_line_id: 3,
            }],
            products
        );
    }
}
