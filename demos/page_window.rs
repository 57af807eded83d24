//! Prints the collapsed page bar for every page of a long list.

use leasedesk::output::render_page_bar;
use leasedesk::pagination::compute_window;

fn main() {
    let total_items = 95;
    let page_size = 10;
    for page in 1..=10 {
        let window = compute_window(total_items, page_size, page);
        println!(
            "page {:>2}: rows {:>2}..{:<3} {}",
            page,
            window.first_index + 1,
            window.last_index,
            render_page_bar(&window)
        );
    }
}
