//! Loads the lots screen from a canned backend and prints it.
//!
//! Run with `cargo run --example list_lots`.

use leasedesk::api::memory::MemoryApi;
use leasedesk::filter::{SearchField, SearchSpec};
use leasedesk::output::{build_report, render_text};
use leasedesk::screens::{builtin_screens, find_screen};
use leasedesk::view::ListViewModel;
use reqwest::Method;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), String> {
    let lots: Vec<_> = (1..=12)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("L-{i:02}"),
                "warehouse_id": i % 3 + 1,
                "area": 10.0 + i as f64 * 1.5,
                "price": 100 + i * 10,
                "status": if i % 4 == 0 { "rented" } else { "free" },
            })
        })
        .collect();
    let mut api = MemoryApi::new().with_json(Method::GET, "lots", json!({ "lots": lots }));
    for (id, name) in [(1, "North"), (2, "Harbour")] {
        api = api.with_json(
            Method::GET,
            &format!("warehouses/{id}"),
            json!({"warehouse": {"id": id, "name": name}}),
        );
    }
    // warehouse 3 is unknown to the backend and renders as "no data"

    let screens = builtin_screens();
    let screen = find_screen(&screens, "lots").ok_or("no lots screen")?;
    let mut vm = ListViewModel::new(screen.clone());
    vm.set_page_size(5);
    println!("{:?}", vm.load(&api).await);

    vm.set_page(2);
    print!("{}", render_text(&build_report(&vm)));

    vm.set_search(SearchSpec::new(SearchField::Field("warehouse_id".into()), "harb"));
    print!("{}", render_text(&build_report(&vm)));
    Ok(())
}
