extern crate sys_info;

use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::cf::snapshot::Snapshot;
use crate::handles::SharedHandlesAndConfig;
use web::Data;

fn push_snapshot(html: &mut String, snapshot: &Snapshot) {
    let stats = &snapshot.stats;
    html.push_str("Built at: ");
    html.push_str(&snapshot.built_at.to_string());
    html.push_str("<br />Age (minutes): ");
    html.push_str(&(Utc::now() - snapshot.built_at).num_minutes().to_string());
    html.push_str("<br />Build duration (micros): ");
    html.push_str(&stats.build_duration_micros.to_string());
    html.push_str("<br />Qty purchase facts: ");
    html.push_str(&stats.qty_facts.to_string());
    html.push_str("<br />Qty customers: ");
    html.push_str(&stats.qty_customers.to_string());
    html.push_str("<br />Qty products: ");
    html.push_str(&stats.qty_products.to_string());
    if let (Some(first), Some(last)) = (stats.first_purchase_date, stats.last_purchase_date) {
        html.push_str("<br />Purchases between: ");
        html.push_str(&first.to_string());
        html.push_str(" / ");
        html.push_str(&last.to_string());
    }
}

// Status page. Only reads the published snapshot, never triggers a refresh.
#[get("/internal")]
pub async fn internal(config: Data<SharedHandlesAndConfig>) -> HttpResponse {
    let mut html = "<html>purchase-reco: product line aware customer recommendations.<br />".to_string();

    let cache = config.service.cache();
    html.push_str("<h3>Purchase matrices</h3>");
    match cache.current() {
        Some(snapshot) => push_snapshot(&mut html, &snapshot),
        None => html.push_str("Not built yet, the first recommendation request builds them."),
    }
    html.push_str("<br />Refresh interval (secs): ");
    html.push_str(&cache.refresh_interval().as_secs().to_string());

    html.push_str("<h3>Model</h3>");
    html.push_str("Similar customers considered: ");
    html.push_str(&config.max_similar_customers.to_string());
    html.push_str("<br />Default qty recommendations: ");
    html.push_str(&config.num_recommendations.to_string());
    html.push_str("<br />Max qty recommendations: ");
    html.push_str(&config.max_num_recommendations.to_string());
    html.push_str("<h3>Machine instance</h3>");
    html.push_str("Qty CPU's detected: ");
    html.push_str(&sys_info::cpu_num().unwrap_or(0).to_string());
    html.push_str("<br />Qty actix workers set: ");
    html.push_str(&config.qty_workers.to_string());
    html.push_str("<br />Active processes on instance: ");
    html.push_str(&sys_info::proc_total().unwrap_or(0).to_string());
    html.push_str("<h3>Metrics</h3>");
    html.push_str("<a href=\"/internal/prometheus\">prometheus</a>");
    html.push_str("</html>");

    HttpResponse::Ok().content_type("text/html").body(html)
}
