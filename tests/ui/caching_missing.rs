use cache_lint::caching;

#[caching(evict(key = "#id"), put(key = "#missing"))]
fn update(id: i32) -> i32 {
    id
}

fn main() {
    let _ = update(1);
}
